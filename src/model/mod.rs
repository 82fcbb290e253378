use derive_new::new;
use serde::{Deserialize, Serialize};

pub use identity::*;
pub use progress::*;
pub use video::*;

mod identity;
mod progress;
mod video;
