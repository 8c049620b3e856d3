// Null backend - validates API usage without touching a native graphics API.
//
// Lets calling code be exercised headless: creation performs the same
// precondition checks a real backend would, then succeeds with empty
// handles. A live-object counter stands in for native allocations so tests
// can prove the failure paths allocate nothing.

use std::cell::Cell;

use crate::ga::{Device, DeviceCreateInfo, DeviceInner, Swapchain, SwapchainCreateInfo, SwapchainInner};
use crate::result::Outcome;

// Representative buffer-count policy for a presentation-capable backend.
const MIN_BUFFER_COUNT: u32 = 2;
const MAX_BUFFER_COUNT: u32 = 4;

thread_local! {
    // Per-thread so tests on different threads account independently, the
    // same scoping the failure-text slot uses.
    static LIVE_OBJECTS: Cell<usize> = const { Cell::new(0) };
}

/// Number of null-backend objects created and not yet destroyed on the
/// calling thread. Test instrumentation standing in for native allocations.
#[cfg(test)]
pub(crate) fn live_object_count() -> usize {
    LIVE_OBJECTS.with(Cell::get)
}

pub(crate) struct NullDevice;

impl NullDevice {
    fn new() -> Self {
        LIVE_OBJECTS.with(|count| count.set(count.get() + 1));
        Self
    }
}

impl Drop for NullDevice {
    fn drop(&mut self) {
        LIVE_OBJECTS.with(|count| count.set(count.get() - 1));
    }
}

pub(crate) struct NullSwapchain {
    image_count: u32,
}

impl NullSwapchain {
    fn new(image_count: u32) -> Self {
        LIVE_OBJECTS.with(|count| count.set(count.get() + 1));
        Self { image_count }
    }

    pub(crate) fn image_count(&self) -> u32 {
        self.image_count
    }
}

impl Drop for NullSwapchain {
    fn drop(&mut self) {
        LIVE_OBJECTS.with(|count| count.set(count.get() - 1));
    }
}

pub(crate) fn create_device(_create_info: &DeviceCreateInfo) -> Outcome<Device> {
    log::info!("Creating null device");

    // The null backend always succeeds.
    Outcome::success(Device {
        inner: DeviceInner::Null(NullDevice::new()),
    })
}

pub(crate) fn create_swapchain(create_info: &SwapchainCreateInfo) -> Outcome<Swapchain> {
    log::info!(
        "Creating null swapchain: {}x{}, {} buffers",
        create_info.width,
        create_info.height,
        create_info.buffer_count
    );

    if create_info.width == 0 {
        return Outcome::fail("Swapchain width must be nonzero");
    }
    if create_info.height == 0 {
        return Outcome::fail("Swapchain height must be nonzero");
    }
    if create_info.buffer_count < MIN_BUFFER_COUNT || create_info.buffer_count > MAX_BUFFER_COUNT {
        return Outcome::fail(format!(
            "Swapchain buffer count {} is outside the supported range [{}, {}]",
            create_info.buffer_count, MIN_BUFFER_COUNT, MAX_BUFFER_COUNT
        ));
    }
    if create_info.display_handle.is_none() && create_info.window_handle.is_none() {
        return Outcome::fail("Swapchain requires a platform window or display handle");
    }

    Outcome::success(Swapchain {
        inner: SwapchainInner::Null(NullSwapchain::new(create_info.buffer_count)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::{self, Backend};
    use crate::result::ResultCode;
    use raw_window_handle::{RawWindowHandle, Win32WindowHandle};

    fn fake_window_handle() -> RawWindowHandle {
        let mut handle = Win32WindowHandle::empty();
        handle.hwnd = 1 as *mut core::ffi::c_void;
        RawWindowHandle::Win32(handle)
    }

    fn swapchain_info<'a>(
        device: &'a Device,
        width: u32,
        height: u32,
        buffer_count: u32,
    ) -> SwapchainCreateInfo<'a> {
        SwapchainCreateInfo {
            device: Some(device),
            display_handle: None,
            window_handle: Some(fake_window_handle()),
            width,
            height,
            buffer_count,
        }
    }

    #[test]
    fn device_lifecycle_is_balanced() {
        let before = live_object_count();
        let device = ga::create_device(&DeviceCreateInfo::default()).into_value();
        assert_eq!(live_object_count(), before + 1);
        ga::destroy_device(Some(device));
        assert_eq!(live_object_count(), before);
    }

    #[test]
    fn swapchain_rejects_zero_width() {
        let device = ga::create_device(&DeviceCreateInfo::default()).into_value();
        let result = ga::create_swapchain(&swapchain_info(&device, 0, 480, 2));
        assert_eq!(result.code(), ResultCode::Failure);
        assert!(result.failure_text().contains("width must be nonzero"));
        ga::destroy_device(Some(device));
    }

    #[test]
    fn swapchain_rejects_zero_height() {
        let device = ga::create_device(&DeviceCreateInfo::default()).into_value();
        let result = ga::create_swapchain(&swapchain_info(&device, 640, 0, 2));
        assert_eq!(result.code(), ResultCode::Failure);
        assert!(result.failure_text().contains("height must be nonzero"));
        ga::destroy_device(Some(device));
    }

    #[test]
    fn swapchain_rejects_out_of_range_buffer_counts() {
        let device = ga::create_device(&DeviceCreateInfo::default()).into_value();
        for buffer_count in [0, 1, 5, 16] {
            let result = ga::create_swapchain(&swapchain_info(&device, 640, 480, buffer_count));
            assert_eq!(result.code(), ResultCode::Failure, "buffer_count {buffer_count}");
            assert!(result.failure_text().contains("buffer count"));
        }
        ga::destroy_device(Some(device));
    }

    #[test]
    fn swapchain_accepts_supported_buffer_counts() {
        let device = ga::create_device(&DeviceCreateInfo::default()).into_value();
        for buffer_count in [2, 3, 4] {
            let result = ga::create_swapchain(&swapchain_info(&device, 640, 480, buffer_count));
            assert_eq!(result.code(), ResultCode::Success, "buffer_count {buffer_count}");

            let swapchain = result.into_value();
            assert_eq!(swapchain.backend(), Backend::Null);
            assert_eq!(swapchain.image_count(), buffer_count);
            ga::destroy_swapchain(Some(swapchain));
        }
        ga::destroy_device(Some(device));
    }

    #[test]
    fn swapchain_requires_some_platform_handle() {
        let device = ga::create_device(&DeviceCreateInfo::default()).into_value();
        let result = ga::create_swapchain(&SwapchainCreateInfo {
            device: Some(&device),
            display_handle: None,
            window_handle: None,
            width: 640,
            height: 480,
            buffer_count: 2,
        });
        assert_eq!(result.code(), ResultCode::Failure);
        assert!(result.failure_text().contains("handle"));
        ga::destroy_device(Some(device));
    }

    #[test]
    fn failed_creation_allocates_nothing() {
        let before = live_object_count();
        let device = ga::create_device(&DeviceCreateInfo::default()).into_value();
        let result = ga::create_swapchain(&swapchain_info(&device, 640, 480, 1));
        assert_eq!(result.code(), ResultCode::Failure);
        // Only the device itself is alive; the failed swapchain left nothing.
        assert_eq!(live_object_count(), before + 1);
        ga::destroy_device(Some(device));
        assert_eq!(live_object_count(), before);
    }
}
