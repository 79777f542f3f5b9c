//! Errors raised while loading a scene.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("cannot open scene file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read scene input: {0}")]
    Io(#[from] io::Error),
    #[error("cannot load texture {path}: {reason}")]
    Texture { path: PathBuf, reason: String },
    #[error("cannot find mtl file: {0}")]
    MaterialFileNotFound(PathBuf),
    #[error("invalid material file {path}: {reason}")]
    MaterialFile { path: PathBuf, reason: String },
    #[error("invalid material '{name}': {reason}")]
    InvalidMaterial { name: String, reason: String },
    #[error("unrecognized object type at line: {0}")]
    UnrecognizedObject(String),
    #[error("unknown object format '{0}'")]
    UnsupportedFormat(String),
    #[error("cannot load mesh {path}: {reason}")]
    MeshParse { path: PathBuf, reason: String },
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("object is missing its material line")]
    MissingMaterial,
    #[error("malformed line '{line}': {reason}")]
    MalformedLine { line: String, reason: &'static str },
    #[error("invalid camera: {0}")]
    Camera(#[from] corelib::CoreError),
}

impl SceneError {
    /// Fatal errors abort the whole scene load; the others only drop the
    /// block being parsed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Io(_) | Self::Texture { .. })
    }

    pub(crate) fn malformed(line: &str, reason: &'static str) -> Self {
        Self::MalformedLine {
            line: line.to_string(),
            reason,
        }
    }
}

pub type SceneResult<T> = Result<T, SceneError>;
