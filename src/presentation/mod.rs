mod frame;
mod repeatable;

pub use frame::{FrameContext, body_viewport, render_frame};
pub use repeatable::{ActiveCursor, InstanceRender, instance_lines};
