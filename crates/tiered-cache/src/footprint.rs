//! In-memory size estimation for values held by [`MemoryStorage`](crate::MemoryStorage)

use std::{mem, rc::Rc, sync::Arc};

/// Estimated byte footprint of a value.
///
/// The default implementation is the value's shallow in-memory size, which is
/// a rough estimate for anything that owns heap data. Buffer-like types
/// override it with their exact byte length.
///
/// ```
/// use tiered_cache::Footprint;
///
/// struct Point { x: f64, y: f64 }
/// impl Footprint for Point {}
///
/// assert_eq!(Point { x: 0.0, y: 0.0 }.footprint(), 16);
/// assert_eq!(vec![0u32; 8].footprint(), 32);
/// ```
pub trait Footprint {
    /// Size in bytes
    fn footprint(&self) -> u64 {
        mem::size_of_val(self) as u64
    }
}

macro_rules! shallow_footprint {
    ($($t:ty),* $(,)?) => {
        $(impl Footprint for $t {})*
    };
}

shallow_footprint!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, ()
);

impl<T> Footprint for [T] {
    fn footprint(&self) -> u64 {
        mem::size_of_val(self) as u64
    }
}

impl<T> Footprint for Vec<T> {
    fn footprint(&self) -> u64 {
        self.as_slice().footprint()
    }
}

impl Footprint for str {
    fn footprint(&self) -> u64 {
        self.len() as u64
    }
}

impl Footprint for String {
    fn footprint(&self) -> u64 {
        self.len() as u64
    }
}

impl Footprint for &'static str {
    fn footprint(&self) -> u64 {
        self.len() as u64
    }
}

impl<T: Footprint + ?Sized> Footprint for Arc<T> {
    fn footprint(&self) -> u64 {
        self.as_ref().footprint()
    }
}

impl<T: Footprint + ?Sized> Footprint for Rc<T> {
    fn footprint(&self) -> u64 {
        self.as_ref().footprint()
    }
}

impl<T: Footprint + ?Sized> Footprint for Box<T> {
    fn footprint(&self) -> u64 {
        self.as_ref().footprint()
    }
}

impl<T: Footprint> Footprint for Option<T> {
    fn footprint(&self) -> u64 {
        self.as_ref().map_or(0, Footprint::footprint)
    }
}

/// Byte size of a raster image: pixel area times bits per pixel, rounded up
/// to whole bytes.
///
/// 32 bits covers RGBA/RGBX and 32-bit integer or float single-channel
/// images, 24 bits RGB-like three-channel modes, 1 bit bilevel images and
/// 8 bits everything else.
pub fn pixel_footprint(width: u32, height: u32, bits_per_pixel: u32) -> u64 {
    let bits = u64::from(width) * u64::from(height) * u64::from(bits_per_pixel);
    bits.div_ceil(8)
}

#[cfg(feature = "image")]
impl Footprint for image::DynamicImage {
    fn footprint(&self) -> u64 {
        let bits = u32::from(self.color().bytes_per_pixel()) * 8;
        pixel_footprint(self.width(), self.height(), bits)
    }
}
