// DX12 backend stand-in for targets without DirectX.
//
// The dispatcher still recognizes the DX12 tag everywhere; requesting it
// here fails with a message instead of failing to build. No DX12 device can
// exist on these targets, so a swapchain entry point is unnecessary: the
// dispatcher routes swapchain creation by the device's own backend.

use crate::ga::{Device, DeviceCreateInfo};
use crate::result::Outcome;

pub(crate) fn create_device(_create_info: &DeviceCreateInfo) -> Outcome<Device> {
    Outcome::fail("DX12 backend is not available on this platform")
}
