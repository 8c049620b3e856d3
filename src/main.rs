// slate-viewer - minimal application shell over the slate graphics stack
//
// Flow: parse CLI -> init logging -> load config -> create window ->
// create device -> create swapchain -> pump events -> tear down swapchain,
// then device, on close.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    window::WindowBuilder,
};

use slate::config::Config;
use slate::ga::{self, Backend, DeviceCreateInfo, SwapchainCreateInfo};

fn main() -> Result<()> {
    let matches = Command::new("slate-viewer")
        .about("Viewer shell for the slate graphics stack")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a config.toml"),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .value_name("NAME")
                .help("Graphics backend: null, dx12, vulkan"),
        )
        .arg(
            Arg::new("validation")
                .long("validation")
                .action(ArgAction::SetTrue)
                .help("Enable graphics API validation layers"),
        )
        .get_matches();

    init_logging();
    log::info!("Starting slate viewer");

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };

    let backend = match matches.get_one::<String>("backend") {
        Some(name) => parse_backend(name)?,
        None => config.get_backend(),
    };
    let enable_validation = matches.get_flag("validation") || config.debug.validation;

    log::info!(
        "Window: {}x{}, backend: {:?}, validation: {}",
        config.window.width,
        config.window.height,
        backend,
        enable_validation
    );

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let window = WindowBuilder::new()
        .with_title(&config.window.title)
        .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
        .build(&event_loop)
        .context("Failed to create window")?;

    let device_result = ga::create_device(&DeviceCreateInfo {
        backend,
        enable_validation,
        app_name: config.window.title.clone(),
        app_version: 1,
    });
    if device_result.is_failure() {
        anyhow::bail!("Device creation failed: {}", device_result.failure_text());
    }
    let device = device_result.into_value();

    let size = window.inner_size();
    let swapchain_result = ga::create_swapchain(&SwapchainCreateInfo {
        device: Some(&device),
        display_handle: Some(window.raw_display_handle()),
        window_handle: Some(window.raw_window_handle()),
        width: size.width,
        height: size.height,
        buffer_count: config.graphics.buffer_count,
    });
    if swapchain_result.is_failure() {
        let message = swapchain_result.failure_text();
        ga::destroy_device(Some(device));
        anyhow::bail!("Swapchain creation failed: {message}");
    }
    let swapchain = swapchain_result.into_value();

    log::info!("Swapchain ready with {} images", swapchain.image_count());

    let mut swapchain = Some(swapchain);
    let mut device = Some(device);
    event_loop.run(move |event, elwt| {
        if let Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } = event
        {
            log::info!("Close requested, shutting down");
            // The swapchain references the device's queues; it goes first.
            ga::destroy_swapchain(swapchain.take());
            ga::destroy_device(device.take());
            elwt.exit();
        }
    })?;

    Ok(())
}

fn parse_backend(name: &str) -> Result<Backend> {
    match name.to_lowercase().as_str() {
        "null" => Ok(Backend::Null),
        "dx12" => Ok(Backend::Dx12),
        "vulkan" => Ok(Backend::Vulkan),
        _ => anyhow::bail!("Unknown graphics backend '{name}'"),
    }
}

/// Initialize logging
fn init_logging() {
    use env_logger::Builder;
    use log::LevelFilter;

    let mut builder = Builder::from_default_env();
    builder.filter_level(LevelFilter::Info);
    builder.init();
}
