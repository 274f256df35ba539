//! API route handlers.

mod acts;
mod calls;
mod explore;
mod proxy;

pub use self::acts::*;
pub use calls::*;
pub use explore::*;
pub use proxy::*;
