pub mod image_sample;

pub use image_sample::ImageSample;
