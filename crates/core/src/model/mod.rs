mod ids;
mod message;
mod session;

pub use ids::{DataId, MessageId, QuestionId, SessionId, UserId};

pub use message::{Message, MessageMeta, Speaker};
pub use session::{AuthStatus, Phase, Session, StatusParseError, Verdict};
