pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::Metadata;
pub use traits::Extractor;
pub use ytdlp::{find_ytdlp, Mode, YtDlpExtractor, YtDlpOptions};
