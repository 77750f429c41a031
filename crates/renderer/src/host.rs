/// Token for one outstanding frame callback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Token for a registered resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeListener(pub u64);

/// The environment driving the background: a display-synchronised frame
/// callback, a viewport that can be queried, and resize notifications.
///
/// Frame callbacks and resize notifications are delivered on the same thread
/// and never overlap.
pub trait FrameHost {
    /// Asks for one frame callback at the next display refresh.
    fn request_frame(&mut self) -> FrameRequest;
    /// Revokes a request that has not fired yet. Unknown requests are ignored.
    fn cancel_frame(&mut self, request: FrameRequest);
    /// Current viewport size in device pixels.
    fn viewport_size(&self) -> (u32, u32);
    fn add_resize_listener(&mut self) -> ResizeListener;
    fn remove_resize_listener(&mut self, listener: ResizeListener);
}
