pub mod colormap;
pub mod hotspot;
pub mod normalize;
pub mod resample;
