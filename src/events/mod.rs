//! # Events Module
//!
//! Progress reporting for organize and duplicate-detection runs.
//!
//! The core emits events through channels so the CLI (or any other front
//! end) can render progress without the core knowing about terminals.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Place(PlaceEvent::Finished(p)) = event {
//!             println!("{} -> {:?}", p.path.display(), p.status);
//!         }
//!     }
//! });
//!
//! OrganizePipeline::builder(input, output).events(sender).build()?.run()?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
