use snafu::Snafu;

use crate::classifier::ModelKind;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AffectError {
    #[snafu(display("failed to load {model} from '{asset_root}': {details}"))]
    ModelLoad {
        stage: &'static str,
        model: ModelKind,
        asset_root: String,
        details: String,
    },
    #[snafu(display("camera access failed on `{stage}`: {details}"))]
    CameraAccess {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("frame classification failed on `{stage}`: {details}"))]
    Classification {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("'{raw}' is not a known emotion label"))]
    UnknownLabel { stage: &'static str, raw: String },
}

pub type AffectResult<T> = Result<T, AffectError>;
