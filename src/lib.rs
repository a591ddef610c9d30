pub mod ask;
pub mod audio;
pub mod config;
pub mod dub;
pub mod error;
pub mod interactive;
pub mod openai;
pub mod pipeline;
pub mod segment;
pub mod session;
pub mod synth;
pub mod timing;
pub mod transcribe;
pub mod translate;

pub use config::Config;
pub use error::{DubError, DubWarning, Result};
pub use pipeline::{
    create_dubbed_video, print_summary, DubRequest, DubResult, DubServices, DubStats,
};
pub use segment::{Segment, Speaker};
pub use session::Session;
