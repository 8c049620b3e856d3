// Graphics abstraction (GA) layer
//
// Dispatches device/swapchain creation to one of three backends and owns the
// opaque handle types the rest of the application works with. Backends never
// call into each other; the dispatcher is the only router.
//
// Swapchain creation is routed by the *device's* backend, never by a
// caller-supplied tag, so a swapchain can only ever be paired with a device
// of the same backend.

mod null;
mod vulkan;

#[cfg(windows)]
mod dx12;
#[cfg(not(windows))]
#[path = "dx12_stub.rs"]
mod dx12;

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::result::Outcome;

#[cfg(windows)]
use windows::Win32::Graphics::{Direct3D12::ID3D12Device, Dxgi::IDXGISwapChain3};

/// Which native graphics API backs a device or swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// No-op implementation for API validation and headless testing.
    Null,
    /// DirectX 12 (Windows builds only; fails with a message elsewhere).
    Dx12,
    /// Vulkan.
    Vulkan,
}

/// Configuration for [`create_device`]. Immutable once passed.
#[derive(Debug, Clone)]
pub struct DeviceCreateInfo {
    pub backend: Backend,
    /// Request API validation/debug layers.
    pub enable_validation: bool,
    pub app_name: String,
    pub app_version: u32,
}

impl Default for DeviceCreateInfo {
    fn default() -> Self {
        Self {
            backend: Backend::Null,
            enable_validation: false,
            app_name: String::from("slate application"),
            app_version: 1,
        }
    }
}

/// Configuration for [`create_swapchain`].
///
/// `device` must be present; the platform handles are whatever the target OS
/// hands out for the window the swapchain will present to. Width and height
/// are the requested client dimensions, `buffer_count` the requested number
/// of presentable images (each backend clamps or rejects it against its own
/// limits).
#[derive(Clone, Copy)]
pub struct SwapchainCreateInfo<'a> {
    pub device: Option<&'a Device>,
    pub display_handle: Option<RawDisplayHandle>,
    pub window_handle: Option<RawWindowHandle>,
    pub width: u32,
    pub height: u32,
    pub buffer_count: u32,
}

/// Opaque handle to a backend-specific logical graphics device.
///
/// Exclusively owned by the caller; destroy through [`destroy_device`] (or by
/// dropping) after every swapchain created from it is gone.
pub struct Device {
    pub(crate) inner: DeviceInner,
}

pub(crate) enum DeviceInner {
    Null(null::NullDevice),
    Vulkan(vulkan::VulkanDevice),
    #[cfg(windows)]
    Dx12(dx12::Dx12Device),
}

impl Device {
    pub fn backend(&self) -> Backend {
        match &self.inner {
            DeviceInner::Null(_) => Backend::Null,
            DeviceInner::Vulkan(_) => Backend::Vulkan,
            #[cfg(windows)]
            DeviceInner::Dx12(_) => Backend::Dx12,
        }
    }

    /// Borrow the backend's primary native object, for interop with
    /// rendering code layered on top of this library.
    pub fn native_handle(&self) -> NativeDeviceHandle<'_> {
        match &self.inner {
            DeviceInner::Null(_) => NativeDeviceHandle::Null,
            DeviceInner::Vulkan(device) => NativeDeviceHandle::Vulkan(device.logical()),
            #[cfg(windows)]
            DeviceInner::Dx12(device) => NativeDeviceHandle::Dx12(device.d3d12_device()),
        }
    }
}

/// Borrowed view of a device's native object, typed by backend.
pub enum NativeDeviceHandle<'a> {
    Null,
    Vulkan(&'a ash::Device),
    #[cfg(windows)]
    Dx12(&'a ID3D12Device),
}

/// Opaque handle to a backend-specific set of presentable images bound to a
/// window surface.
///
/// Holds a non-owning reference to its device's internals; the caller must
/// destroy the swapchain before the device that created it.
pub struct Swapchain {
    pub(crate) inner: SwapchainInner,
}

pub(crate) enum SwapchainInner {
    Null(null::NullSwapchain),
    Vulkan(vulkan::VulkanSwapchain),
    #[cfg(windows)]
    Dx12(dx12::Dx12Swapchain),
}

impl Swapchain {
    pub fn backend(&self) -> Backend {
        match &self.inner {
            SwapchainInner::Null(_) => Backend::Null,
            SwapchainInner::Vulkan(_) => Backend::Vulkan,
            #[cfg(windows)]
            SwapchainInner::Dx12(_) => Backend::Dx12,
        }
    }

    /// Number of presentable images actually backing the swapchain after
    /// negotiation with the native API.
    pub fn image_count(&self) -> u32 {
        match &self.inner {
            SwapchainInner::Null(swapchain) => swapchain.image_count(),
            SwapchainInner::Vulkan(swapchain) => swapchain.image_count(),
            #[cfg(windows)]
            SwapchainInner::Dx12(swapchain) => swapchain.image_count(),
        }
    }

    pub fn native_handle(&self) -> NativeSwapchainHandle<'_> {
        match &self.inner {
            SwapchainInner::Null(_) => NativeSwapchainHandle::Null,
            SwapchainInner::Vulkan(swapchain) => {
                NativeSwapchainHandle::Vulkan(swapchain.handle())
            }
            #[cfg(windows)]
            SwapchainInner::Dx12(swapchain) => {
                NativeSwapchainHandle::Dx12(swapchain.handle())
            }
        }
    }
}

/// Borrowed view of a swapchain's native object, typed by backend.
pub enum NativeSwapchainHandle<'a> {
    Null,
    Vulkan(&'a ash::vk::SwapchainKHR),
    #[cfg(windows)]
    Dx12(&'a IDXGISwapChain3),
}

/// Create a device through the backend named in `create_info`.
pub fn create_device(create_info: &DeviceCreateInfo) -> Outcome<Device> {
    match create_info.backend {
        Backend::Null => null::create_device(create_info),
        Backend::Dx12 => dx12::create_device(create_info),
        Backend::Vulkan => vulkan::create_device(create_info),
    }
}

/// Destroy a device, releasing all backend-owned resources. `None` is a
/// no-op. Any swapchain created from the device must already be gone.
pub fn destroy_device(device: Option<Device>) {
    let Some(device) = device else {
        return;
    };
    drop(device);
}

/// Create a swapchain for `create_info.device`, routed by that device's own
/// backend.
pub fn create_swapchain(create_info: &SwapchainCreateInfo) -> Outcome<Swapchain> {
    let Some(device) = create_info.device else {
        return Outcome::fail("Device cannot be null");
    };

    match &device.inner {
        DeviceInner::Null(_) => null::create_swapchain(create_info),
        DeviceInner::Vulkan(device) => vulkan::create_swapchain(device, create_info),
        #[cfg(windows)]
        DeviceInner::Dx12(device) => dx12::create_swapchain(device, create_info),
    }
}

/// Destroy a swapchain, releasing per-image views, the native swapchain
/// object, and the surface, in that order. `None` is a no-op.
pub fn destroy_swapchain(swapchain: Option<Swapchain>) {
    let Some(swapchain) = swapchain else {
        return;
    };
    drop(swapchain);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultCode;
    use raw_window_handle::{Win32WindowHandle, WindowsDisplayHandle};

    fn fake_window_handle() -> RawWindowHandle {
        let mut handle = Win32WindowHandle::empty();
        handle.hwnd = 1 as *mut core::ffi::c_void;
        RawWindowHandle::Win32(handle)
    }

    fn fake_display_handle() -> RawDisplayHandle {
        RawDisplayHandle::Windows(WindowsDisplayHandle::empty())
    }

    fn null_device() -> Device {
        create_device(&DeviceCreateInfo::default()).into_value()
    }

    #[test]
    fn null_device_creation_succeeds() {
        let result = create_device(&DeviceCreateInfo::default());
        assert_eq!(result.code(), ResultCode::Success);

        let device = result.into_value();
        assert_eq!(device.backend(), Backend::Null);
        assert!(matches!(device.native_handle(), NativeDeviceHandle::Null));
        destroy_device(Some(device));
    }

    #[test]
    fn swapchain_requires_a_device() {
        let result = create_swapchain(&SwapchainCreateInfo {
            device: None,
            display_handle: Some(fake_display_handle()),
            window_handle: Some(fake_window_handle()),
            width: 640,
            height: 480,
            buffer_count: 2,
        });
        assert_eq!(result.code(), ResultCode::Failure);
        assert_eq!(result.failure_text(), "Device cannot be null");
    }

    #[test]
    fn swapchain_backend_mirrors_device_backend() {
        let device = null_device();
        let swapchain = create_swapchain(&SwapchainCreateInfo {
            device: Some(&device),
            display_handle: Some(fake_display_handle()),
            window_handle: Some(fake_window_handle()),
            width: 640,
            height: 480,
            buffer_count: 3,
        })
        .into_value();

        assert_eq!(swapchain.backend(), device.backend());
        destroy_swapchain(Some(swapchain));
        destroy_device(Some(device));
    }

    #[test]
    fn destroying_nothing_is_a_no_op() {
        destroy_device(None);
        destroy_swapchain(None);
    }

    #[test]
    fn device_survives_failed_swapchain_creation() {
        let device = null_device();
        let result = create_swapchain(&SwapchainCreateInfo {
            device: Some(&device),
            display_handle: Some(fake_display_handle()),
            window_handle: Some(fake_window_handle()),
            width: 0,
            height: 480,
            buffer_count: 2,
        });
        assert_eq!(result.code(), ResultCode::Failure);
        assert!(result.failure_text().contains("width"));

        // The failed attempt must not have damaged the device.
        assert_eq!(device.backend(), Backend::Null);
        destroy_device(Some(device));
    }

    #[cfg(not(windows))]
    #[test]
    fn dx12_is_unavailable_off_windows() {
        let result = create_device(&DeviceCreateInfo {
            backend: Backend::Dx12,
            ..Default::default()
        });
        assert_eq!(result.code(), ResultCode::Failure);
        assert!(result.failure_text().contains("not available"));
    }
}
