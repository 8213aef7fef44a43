#![forbid(unsafe_code)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod scripted;

pub use api::{
    AnswerGrading, AnswerReview, AuthProgress, CsvUpload, QuestionPrompt, SessionReport,
    UploadReceipt, VerificationApi,
};
pub use client::VerificationClient;
pub use config::ClientConfig;
pub use error::TransportError;
pub use scripted::ScriptedVerifier;
