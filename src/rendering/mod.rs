pub mod compositor;
pub mod resample;

pub use compositor::Compositor;
