// DX12 backend
//
// Device: optional debug layer, DXGI factory, hardware adapter scan at
// feature level 12_1, D3D12 device plus a direct command queue.
// Swapchain: flip-model DXGI swapchain bound to the window, back buffers,
// and an RTV descriptor heap with one render-target view per buffer.
//
// COM interface pointers release themselves when dropped, so a failed
// creation attempt unwinds whatever locals exist in reverse order without
// explicit cleanup code.

use raw_window_handle::RawWindowHandle;

use windows::core::Interface;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::D3D_FEATURE_LEVEL_12_1;
use windows::Win32::Graphics::Direct3D12::{
    D3D12CreateDevice, D3D12GetDebugInterface, ID3D12CommandQueue, ID3D12Debug,
    ID3D12DescriptorHeap, ID3D12Device, ID3D12Resource, D3D12_COMMAND_LIST_TYPE_DIRECT,
    D3D12_COMMAND_QUEUE_DESC, D3D12_CPU_DESCRIPTOR_HANDLE, D3D12_DESCRIPTOR_HEAP_DESC,
    D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
};
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT_R8G8B8A8_UNORM, DXGI_SAMPLE_DESC};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory2, IDXGIAdapter1, IDXGIFactory4, IDXGISwapChain1, IDXGISwapChain3,
    DXGI_ADAPTER_FLAG, DXGI_ADAPTER_FLAG_NONE, DXGI_ADAPTER_FLAG_SOFTWARE,
    DXGI_CREATE_FACTORY_DEBUG, DXGI_CREATE_FACTORY_FLAGS, DXGI_SWAP_CHAIN_DESC1,
    DXGI_SWAP_EFFECT_FLIP_DISCARD, DXGI_USAGE_RENDER_TARGET_OUTPUT,
};

use crate::ga::{Device, DeviceCreateInfo, DeviceInner, Swapchain, SwapchainCreateInfo, SwapchainInner};
use crate::result::Outcome;

// DXGI_MAX_SWAP_CHAIN_BUFFERS; flip model needs at least two.
const MIN_BUFFER_COUNT: u32 = 2;
const MAX_BUFFER_COUNT: u32 = 16;

// Fields release in declaration order: queue before device before adapter
// before factory.
pub(crate) struct Dx12Device {
    queue: ID3D12CommandQueue,
    device: ID3D12Device,
    adapter: IDXGIAdapter1,
    factory: IDXGIFactory4,
}

impl Dx12Device {
    pub(crate) fn d3d12_device(&self) -> &ID3D12Device {
        &self.device
    }
}

impl Drop for Dx12Device {
    fn drop(&mut self) {
        log::info!("Destroying DX12 device");
        log::debug!("Releasing ID3D12CommandQueue {:?}", self.queue);
        log::debug!("Releasing ID3D12Device {:?}", self.device);
        log::debug!("Releasing IDXGIAdapter1 {:?}", self.adapter);
        log::debug!("Releasing IDXGIFactory4 {:?}", self.factory);
    }
}

pub(crate) fn create_device(create_info: &DeviceCreateInfo) -> Outcome<Device> {
    log::info!("Creating DX12 device for '{}'", create_info.app_name);

    if create_info.enable_validation {
        let mut debug: Option<ID3D12Debug> = None;
        if unsafe { D3D12GetDebugInterface(&mut debug) }.is_ok() {
            if let Some(debug) = debug {
                unsafe { debug.EnableDebugLayer() };
                log::info!("D3D12 debug layer enabled");
            }
        }
    }

    let factory_flags = if create_info.enable_validation {
        DXGI_CREATE_FACTORY_DEBUG
    } else {
        DXGI_CREATE_FACTORY_FLAGS::default()
    };

    let factory: IDXGIFactory4 = match unsafe { CreateDXGIFactory2(factory_flags) } {
        Ok(factory) => factory,
        Err(err) => return Outcome::fail(format!("Failed to create DXGI factory: {err}")),
    };

    log::info!("DXGI factory created");

    // First hardware adapter that can run feature level 12_1 wins.
    let mut selected = None;
    for index in 0.. {
        let adapter = match unsafe { factory.EnumAdapters1(index) } {
            Ok(adapter) => adapter,
            Err(_) => break,
        };

        let desc = match unsafe { adapter.GetDesc1() } {
            Ok(desc) => desc,
            Err(_) => continue,
        };

        // Skip software adapters.
        if (DXGI_ADAPTER_FLAG(desc.Flags as i32) & DXGI_ADAPTER_FLAG_SOFTWARE)
            != DXGI_ADAPTER_FLAG_NONE
        {
            continue;
        }

        // Probe only; no device is created with a null out-pointer.
        if unsafe {
            D3D12CreateDevice(
                &adapter,
                D3D_FEATURE_LEVEL_12_1,
                std::ptr::null_mut::<Option<ID3D12Device>>(),
            )
        }
        .is_ok()
        {
            selected = Some(adapter);
            break;
        }
    }

    let Some(adapter) = selected else {
        return Outcome::fail("Failed to find a suitable graphics adapter");
    };

    log::info!("Found suitable graphics adapter");

    let mut device: Option<ID3D12Device> = None;
    if let Err(err) = unsafe { D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_12_1, &mut device) } {
        return Outcome::fail(format!("Failed to create D3D12 device: {err}"));
    }
    let Some(device) = device else {
        return Outcome::fail("Failed to create D3D12 device");
    };

    let queue_desc = D3D12_COMMAND_QUEUE_DESC {
        Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
        ..Default::default()
    };
    let queue: ID3D12CommandQueue = match unsafe { device.CreateCommandQueue(&queue_desc) } {
        Ok(queue) => queue,
        Err(err) => return Outcome::fail(format!("Failed to create D3D12 command queue: {err}")),
    };

    log::info!("D3D12 device and direct command queue created");

    Outcome::success(Device {
        inner: DeviceInner::Dx12(Dx12Device {
            queue,
            device,
            adapter,
            factory,
        }),
    })
}

// Fields release in declaration order: RTV heap before the back buffers
// before the swapchain object.
pub(crate) struct Dx12Swapchain {
    rtv_heap: ID3D12DescriptorHeap,
    buffers: Vec<ID3D12Resource>,
    swapchain: IDXGISwapChain3,
}

impl Dx12Swapchain {
    pub(crate) fn image_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    pub(crate) fn handle(&self) -> &IDXGISwapChain3 {
        &self.swapchain
    }
}

impl Drop for Dx12Swapchain {
    fn drop(&mut self) {
        log::info!("Destroying DX12 swapchain");
        log::debug!("Releasing ID3D12DescriptorHeap {:?}", self.rtv_heap);
        log::debug!("Releasing {} back buffers", self.buffers.len());
        log::debug!("Releasing IDXGISwapChain3 {:?}", self.swapchain);
    }
}

pub(crate) fn create_swapchain(
    device: &Dx12Device,
    create_info: &SwapchainCreateInfo,
) -> Outcome<Swapchain> {
    log::info!(
        "Creating DX12 swapchain: {}x{}, {} buffers",
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
    if create_info.buffer_count < MIN_BUFFER_COUNT || create_info.buffer_count > MAX_BUFFER_COUNT {
        return Outcome::fail(format!(
            "Swapchain buffer count {} is outside the DXGI-supported range [{}, {}]",
            create_info.buffer_count, MIN_BUFFER_COUNT, MAX_BUFFER_COUNT
        ));
    }

    let hwnd = match create_info.window_handle {
        Some(RawWindowHandle::Win32(handle)) => HWND(handle.hwnd as isize),
        Some(_) => return Outcome::fail("Window handle is not a Win32 handle"),
        None => return Outcome::fail("Invalid window handle"),
    };
    if hwnd.0 == 0 {
        return Outcome::fail("Invalid window handle");
    }

    let desc = DXGI_SWAP_CHAIN_DESC1 {
        Width: create_info.width,
        Height: create_info.height,
        Format: DXGI_FORMAT_R8G8B8A8_UNORM,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
        BufferCount: create_info.buffer_count,
        SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
        ..Default::default()
    };

    // Flip-model swapchains present through the device's direct queue.
    let swapchain: IDXGISwapChain1 = match unsafe {
        device
            .factory
            .CreateSwapChainForHwnd(&device.queue, hwnd, &desc, None, None)
    } {
        Ok(swapchain) => swapchain,
        Err(err) => return Outcome::fail(format!("Failed to create DXGI swapchain: {err}")),
    };

    let swapchain: IDXGISwapChain3 = match swapchain.cast() {
        Ok(swapchain) => swapchain,
        Err(err) => {
            return Outcome::fail(format!("Swapchain does not support IDXGISwapChain3: {err}"))
        }
    };

    log::info!("DXGI swapchain created");

    let heap_desc = D3D12_DESCRIPTOR_HEAP_DESC {
        Type: D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
        NumDescriptors: create_info.buffer_count,
        ..Default::default()
    };
    let rtv_heap: ID3D12DescriptorHeap =
        match unsafe { device.device.CreateDescriptorHeap(&heap_desc) } {
            Ok(heap) => heap,
            Err(err) => {
                return Outcome::fail(format!("Failed to create RTV descriptor heap: {err}"))
            }
        };

    let rtv_size = unsafe {
        device
            .device
            .GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_RTV)
    } as usize;
    let heap_start = unsafe { rtv_heap.GetCPUDescriptorHandleForHeapStart() };

    let mut buffers = Vec::with_capacity(create_info.buffer_count as usize);
    for index in 0..create_info.buffer_count {
        let buffer: ID3D12Resource = match unsafe { swapchain.GetBuffer(index) } {
            Ok(buffer) => buffer,
            Err(err) => {
                return Outcome::fail(format!("Failed to get swapchain buffer {index}: {err}"))
            }
        };

        let rtv = D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: heap_start.ptr + index as usize * rtv_size,
        };
        unsafe { device.device.CreateRenderTargetView(&buffer, None, rtv) };
        buffers.push(buffer);
    }

    log::info!("Created {} render-target views", buffers.len());

    Outcome::success(Swapchain {
        inner: SwapchainInner::Dx12(Dx12Swapchain {
            rtv_heap,
            buffers,
            swapchain,
        }),
    })
}
