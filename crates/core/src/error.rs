use thiserror::Error;

use crate::codec::CodecError;
use crate::model::LearningPathError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    LearningPath(#[from] LearningPathError),
}
