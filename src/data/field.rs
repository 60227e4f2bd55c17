//! `FieldAccess`: per-element access to one physical field.
//!
//! The exchange never knows which physical quantity it is moving. Callers hand
//! it an ordered list of field accessors, and the same order is used when
//! packing on the sender and unpacking on the receiver.

/// Element-wise read/write capability over one field array.
pub trait FieldAccess<T: Copy> {
    /// Number of addressable elements.
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> T;

    fn set(&mut self, index: usize, value: T);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Copy> FieldAccess<T> for [T] {
    #[inline]
    fn len(&self) -> usize {
        <[T]>::len(self)
    }
    #[inline]
    fn get(&self, index: usize) -> T {
        self[index]
    }
    #[inline]
    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }
}

impl<T: Copy> FieldAccess<T> for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }
    #[inline]
    fn get(&self, index: usize) -> T {
        self[index]
    }
    #[inline]
    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }
}

/// A field stored interleaved with others (`stride` values per node,
/// this field at `component`), e.g. `[x0, y0, z0, x1, y1, z1, ..]`.
pub struct Strided<'a, T> {
    data: &'a mut [T],
    stride: usize,
    component: usize,
}

impl<'a, T> Strided<'a, T> {
    /// View component `component` of `data`.
    ///
    /// # Panics
    /// Panics if `component >= stride` or `stride == 0`.
    pub fn new(data: &'a mut [T], stride: usize, component: usize) -> Self {
        assert!(component < stride, "component {component} out of stride {stride}");
        Self {
            data,
            stride,
            component,
        }
    }
}

impl<T: Copy> FieldAccess<T> for Strided<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        (self.data.len() + self.stride - 1 - self.component) / self.stride
    }
    #[inline]
    fn get(&self, index: usize) -> T {
        self.data[index * self.stride + self.component]
    }
    #[inline]
    fn set(&mut self, index: usize, value: T) {
        self.data[index * self.stride + self.component] = value;
    }
}
