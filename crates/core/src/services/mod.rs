//! Business logic services.

#![allow(missing_docs)]

pub mod ai;
pub mod auth;
pub mod comment;
pub mod email;
pub mod identity;
pub mod otp;
pub mod policy;
pub mod push;
pub mod results;
pub mod seed;
pub mod user;
pub mod vote;

pub use ai::{AiService, GeminiAnalyzer, PolicyAnalyzer, PolicyEnrichment, ProsCons};
pub use auth::{
    AuthService, AuthToken, Claims, GoogleProfile, GoogleSignInInput, GoogleTokenInfoVerifier,
    GoogleVerifier, OtpDispatch, SendOtpInput, UserSummary, VerifyOtpInput,
};
pub use comment::{CommentService, CommentView, CreateCommentInput};
pub use email::EmailService;
pub use identity::{Identity, IdentityService, VerifiedIdentity};
pub use otp::{MemoryOtpStore, OtpStore, RedisOtpStore};
pub use policy::{CreatePolicyInput, PolicyService};
pub use push::{FcmSender, PushMessage, PushReport, PushSender, PushService};
pub use results::{PolicyResults, PolicyWithStats, ResultsService, VoteTally};
pub use seed::seed_sample_policies;
pub use user::{UpdateProfileInput, UserProfile, UserService, VoteHistoryEntry, VotingStats};
pub use vote::VoteService;
