// Vulkan backend
//
// Device: instance creation (with optional validation layer + debug
// messenger), physical device selection, logical device + graphics queue.
// Swapchain: surface creation, presentation negotiation, per-image views.
//
// Failure policy: every native resource acquired during a creation attempt
// is released, newest first, before the failure is returned. Partial
// swapchain state lives inside the swapchain object itself so an early
// return unwinds it through Drop, the same null-handle-checked teardown the
// happy path uses.

use std::ffi::{CStr, CString};

use ash::extensions::{ext::DebugUtils, khr};
use ash::{vk, Entry};

use crate::ga::{Device, DeviceCreateInfo, DeviceInner, Swapchain, SwapchainCreateInfo, SwapchainInner};
use crate::result::Outcome;

pub(crate) struct VulkanDevice {
    pub(crate) entry: Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanDevice {
    pub(crate) fn logical(&self) -> &ash::Device {
        &self.device
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device");
        log::debug!("Releasing graphics queue {:?}", self.graphics_queue);
        unsafe {
            // Let in-flight work finish before the queues disappear.
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);

            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

pub(crate) fn create_device(create_info: &DeviceCreateInfo) -> Outcome<Device> {
    log::info!("Creating Vulkan device for '{}'", create_info.app_name);

    let entry = match unsafe { Entry::load() } {
        Ok(entry) => entry,
        Err(err) => {
            return Outcome::fail(format!(
                "Failed to load the Vulkan library: {err}. Is a Vulkan driver installed?"
            ))
        }
    };

    let instance = match create_instance(&entry, create_info) {
        Ok(instance) => instance,
        Err(message) => return Outcome::fail(message),
    };

    let debug_utils = if create_info.enable_validation {
        match create_debug_messenger(&entry, &instance) {
            Ok(pair) => Some(pair),
            Err(message) => {
                unsafe { instance.destroy_instance(None) };
                return Outcome::fail(message);
            }
        }
    } else {
        None
    };

    let (physical_device, graphics_queue_family) = match pick_physical_device(&instance) {
        Ok(selection) => selection,
        Err(message) => {
            unsafe { destroy_instance_state(&instance, debug_utils) };
            return Outcome::fail(message);
        }
    };

    let (device, graphics_queue) =
        match create_logical_device(&instance, physical_device, graphics_queue_family) {
            Ok(pair) => pair,
            Err(message) => {
                unsafe { destroy_instance_state(&instance, debug_utils) };
                return Outcome::fail(message);
            }
        };

    log::info!("Vulkan logical device created");

    Outcome::success(Device {
        inner: DeviceInner::Vulkan(VulkanDevice {
            entry,
            instance,
            physical_device,
            device,
            graphics_queue,
            graphics_queue_family,
            debug_utils,
        }),
    })
}

// Reverse-order release of everything created before logical-device setup.
unsafe fn destroy_instance_state(
    instance: &ash::Instance,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
) {
    if let Some((debug_utils, messenger)) = debug_utils {
        debug_utils.destroy_debug_utils_messenger(messenger, None);
    }
    instance.destroy_instance(None);
}

fn create_instance(entry: &Entry, create_info: &DeviceCreateInfo) -> Result<ash::Instance, String> {
    let app_name = CString::new(create_info.app_name.as_str())
        .map_err(|_| String::from("Application name must not contain NUL bytes"))?;

    let app_info = vk::ApplicationInfo::builder()
        .application_name(&app_name)
        .application_version(create_info.app_version)
        .engine_name(c"slate")
        .engine_version(vk::make_api_version(0, 1, 0, 0))
        .api_version(vk::API_VERSION_1_3);

    // Surface extensions for the platforms we create windows on.
    let mut extensions = vec![khr::Surface::name().as_ptr()];
    #[cfg(target_os = "windows")]
    extensions.push(khr::Win32Surface::name().as_ptr());
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        extensions.push(khr::XlibSurface::name().as_ptr());
        extensions.push(khr::XcbSurface::name().as_ptr());
        extensions.push(khr::WaylandSurface::name().as_ptr());
    }
    #[cfg(target_os = "macos")]
    extensions.push(ash::extensions::ext::MetalSurface::name().as_ptr());

    if create_info.enable_validation {
        extensions.push(DebugUtils::name().as_ptr());
    }

    let layers = if create_info.enable_validation {
        vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
    } else {
        Vec::new()
    };

    let instance_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layers);

    let instance = unsafe { entry.create_instance(&instance_info, None) }
        .map_err(|err| format!("Failed to create Vulkan instance: {err}"))?;

    log::info!("Vulkan instance created");
    Ok(instance)
}

fn create_debug_messenger(
    entry: &Entry,
    instance: &ash::Instance,
) -> Result<(DebugUtils, vk::DebugUtilsMessengerEXT), String> {
    let debug_utils = DebugUtils::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
        .map_err(|err| format!("Failed to create debug messenger: {err}"))?;

    Ok((debug_utils, messenger))
}

fn pick_physical_device(instance: &ash::Instance) -> Result<(vk::PhysicalDevice, u32), String> {
    let devices = unsafe { instance.enumerate_physical_devices() }
        .map_err(|err| format!("Failed to enumerate physical devices: {err}"))?;

    if devices.is_empty() {
        return Err(String::from("No Vulkan-capable GPU found"));
    }

    log::info!("Found {} Vulkan physical devices", devices.len());

    let mut best_device = None;
    let mut best_score = 0;

    for device in devices {
        let properties = unsafe { instance.get_physical_device_properties(device) };

        // Software rasterizers do not qualify.
        if properties.device_type == vk::PhysicalDeviceType::CPU {
            continue;
        }
        if properties.api_version < vk::API_VERSION_1_3 {
            continue;
        }

        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };
        let graphics_family = queue_families
            .iter()
            .enumerate()
            .find(|(_, family)| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|(index, _)| index as u32);

        let Some(graphics_family) = graphics_family else {
            continue;
        };

        let score = match properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
            _ => 1,
        };

        if score > best_score {
            best_score = score;
            best_device = Some((device, graphics_family));
        }
    }

    let (device, graphics_family) =
        best_device.ok_or_else(|| String::from("No suitable GPU found"))?;

    let properties = unsafe { instance.get_physical_device_properties(device) };
    log::info!(
        "Selected GPU: {} (Vulkan {}.{}.{}), graphics queue family {}",
        unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy(),
        vk::api_version_major(properties.api_version),
        vk::api_version_minor(properties.api_version),
        vk::api_version_patch(properties.api_version),
        graphics_family,
    );

    Ok((device, graphics_family))
}

fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    graphics_queue_family: u32,
) -> Result<(ash::Device, vk::Queue), String> {
    let queue_priorities = [1.0];
    let queue_info = vk::DeviceQueueCreateInfo::builder()
        .queue_family_index(graphics_queue_family)
        .queue_priorities(&queue_priorities)
        .build();

    let extensions = [khr::Swapchain::name().as_ptr()];
    let features = vk::PhysicalDeviceFeatures::default();

    let device_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(std::slice::from_ref(&queue_info))
        .enabled_extension_names(&extensions)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(physical_device, &device_info, None) }
        .map_err(|err| format!("Failed to create Vulkan logical device: {err}"))?;

    let graphics_queue = unsafe { device.get_device_queue(graphics_queue_family, 0) };

    Ok((device, graphics_queue))
}

pub(crate) struct VulkanSwapchain {
    // Non-owning copies of the device's dispatch tables; the device itself
    // is never destroyed through these.
    device: ash::Device,
    surface_loader: khr::Surface,
    swapchain_loader: khr::Swapchain,
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
}

impl VulkanSwapchain {
    pub(crate) fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    pub(crate) fn handle(&self) -> &vk::SwapchainKHR {
        &self.swapchain
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan swapchain");
        unsafe {
            for &view in &self.image_views {
                if view != vk::ImageView::null() {
                    self.device.destroy_image_view(view, None);
                }
            }
            self.image_views.clear();
            self.images.clear();

            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
                self.swapchain = vk::SwapchainKHR::null();
            }

            if self.surface != vk::SurfaceKHR::null() {
                self.surface_loader.destroy_surface(self.surface, None);
                self.surface = vk::SurfaceKHR::null();
            }
        }
    }
}

pub(crate) fn create_swapchain(
    device: &VulkanDevice,
    create_info: &SwapchainCreateInfo,
) -> Outcome<Swapchain> {
    log::info!(
        "Creating Vulkan swapchain: {}x{}, {} buffers requested",
        create_info.width,
        create_info.height,
        create_info.buffer_count
    );

    // Preconditions, checked before any native call.
    if create_info.width == 0 {
        return Outcome::fail("Swapchain width must be nonzero");
    }
    if create_info.height == 0 {
        return Outcome::fail("Swapchain height must be nonzero");
    }
    if create_info.buffer_count == 0 {
        return Outcome::fail("Swapchain buffer count must be nonzero");
    }
    let Some(display_handle) = create_info.display_handle else {
        return Outcome::fail("Invalid display handle");
    };
    let Some(window_handle) = create_info.window_handle else {
        return Outcome::fail("Invalid window handle");
    };

    let surface_loader = khr::Surface::new(&device.entry, &device.instance);
    let surface = match unsafe {
        ash_window::create_surface(
            &device.entry,
            &device.instance,
            display_handle,
            window_handle,
            None,
        )
    } {
        Ok(surface) => surface,
        Err(err) => return Outcome::fail(format!("Failed to create window surface: {err}")),
    };

    log::info!("Window surface created");

    // Partial state now lives in the swapchain object; early returns below
    // drop it and release surface/swapchain/views in dependency order.
    let mut swapchain = VulkanSwapchain {
        device: device.device.clone(),
        surface_loader,
        swapchain_loader: khr::Swapchain::new(&device.instance, &device.device),
        surface,
        swapchain: vk::SwapchainKHR::null(),
        images: Vec::new(),
        image_views: Vec::new(),
    };

    let present_support = match unsafe {
        swapchain.surface_loader.get_physical_device_surface_support(
            device.physical_device,
            device.graphics_queue_family,
            swapchain.surface,
        )
    } {
        Ok(supported) => supported,
        Err(err) => return Outcome::fail(format!("Failed to query presentation support: {err}")),
    };
    if !present_support {
        return Outcome::fail("Graphics queue family does not support presentation");
    }

    let capabilities = match unsafe {
        swapchain
            .surface_loader
            .get_physical_device_surface_capabilities(device.physical_device, swapchain.surface)
    } {
        Ok(capabilities) => capabilities,
        Err(err) => return Outcome::fail(format!("Failed to get surface capabilities: {err}")),
    };

    let formats = match unsafe {
        swapchain
            .surface_loader
            .get_physical_device_surface_formats(device.physical_device, swapchain.surface)
    } {
        Ok(formats) => formats,
        Err(err) => return Outcome::fail(format!("Failed to get surface formats: {err}")),
    };
    if formats.is_empty() {
        return Outcome::fail("No surface formats available");
    }

    let present_modes = match unsafe {
        swapchain
            .surface_loader
            .get_physical_device_surface_present_modes(device.physical_device, swapchain.surface)
    } {
        Ok(modes) => modes,
        Err(err) => return Outcome::fail(format!("Failed to get present modes: {err}")),
    };
    if present_modes.is_empty() {
        return Outcome::fail("No present modes available");
    }

    // Prefer 8-bit BGRA with the standard color space, else take what the
    // surface reports first.
    let surface_format = formats
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_UNORM
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(formats[0]);

    // MAILBOX when the driver offers it; FIFO is always available.
    let present_mode = present_modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO);

    let extent = if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: create_info.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: create_info.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    };

    let mut image_count = create_info.buffer_count.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        image_count = image_count.min(capabilities.max_image_count);
    }

    log::info!(
        "Swapchain negotiation: format {:?}, present mode {:?}, extent {}x{}, {} images",
        surface_format.format,
        present_mode,
        extent.width,
        extent.height,
        image_count
    );

    let queue_family_indices = [device.graphics_queue_family];
    let swapchain_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(swapchain.surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .queue_family_indices(&queue_family_indices)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true);

    swapchain.swapchain = match unsafe {
        swapchain
            .swapchain_loader
            .create_swapchain(&swapchain_info, None)
    } {
        Ok(handle) => handle,
        Err(err) => return Outcome::fail(format!("Failed to create swapchain: {err}")),
    };

    swapchain.images = match unsafe {
        swapchain
            .swapchain_loader
            .get_swapchain_images(swapchain.swapchain)
    } {
        Ok(images) => images,
        Err(err) => return Outcome::fail(format!("Failed to get swapchain images: {err}")),
    };

    log::info!("Retrieved {} swapchain images", swapchain.images.len());

    for (index, &image) in swapchain.images.iter().enumerate() {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(surface_format.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        match unsafe { swapchain.device.create_image_view(&view_info, None) } {
            Ok(view) => swapchain.image_views.push(view),
            Err(err) => {
                return Outcome::fail(format!("Failed to create image view {index}: {err}"))
            }
        }
    }

    Outcome::success(Swapchain {
        inner: SwapchainInner::Vulkan(swapchain),
    })
}

// Validation layer messages routed into the logging facade.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}
