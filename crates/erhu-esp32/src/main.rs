use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use embedded_graphics::{
    pixelcolor::{BinaryColor, Rgb565},
    prelude::*,
    primitives::Rectangle,
};
use esp_idf_hal::{
    delay::FreeRtos,
    gpio::PinDriver,
    prelude::*,
    spi::{Dma, SpiDeviceDriver, SpiDriver, SpiDriverConfig},
    units::FromValueType,
};
use mipidsi::{
    Builder,
    interface::SpiInterface,
    models::ST7789,
    options::{ColorInversion, Orientation, Rotation},
};

use erhu_core::app::App;
use erhu_core::consts;

mod peripherals;

use peripherals::{EspSpeaker, KeyDriver, SystemPeripherals};

/// Panel dimensions in landscape orientation.
const PANEL_WIDTH: u32 = 280;
const PANEL_HEIGHT: u32 = 240;

/// Pixel doubling factor from the 128x64 frame to the panel.
const SCALE: u32 = 2;

// 1-bit framebuffer that implements DrawTarget
struct Framebuffer {
    data: Box<[bool]>,
    width: u32,
    height: u32,
}

impl Framebuffer {
    fn new(width: u32, height: u32) -> Self {
        let size = (width * height) as usize;
        let data = vec![false; size].into_boxed_slice();
        Self {
            data,
            width,
            height,
        }
    }

    /// Panel pixels for the doubled blit, row-major.
    fn iter_scaled(&self) -> impl Iterator<Item = Rgb565> + '_ {
        (0..self.height * SCALE).flat_map(move |y| {
            (0..self.width * SCALE).map(move |x| {
                let index = ((y / SCALE) * self.width + x / SCALE) as usize;
                if self.data[index] {
                    Rgb565::WHITE
                } else {
                    Rgb565::BLACK
                }
            })
        })
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && point.x < self.width as i32
                && point.y >= 0
                && point.y < self.height as i32
            {
                let index = (point.y as u32 * self.width + point.x as u32) as usize;
                self.data[index] = color.is_on();
            }
        }
        Ok(())
    }
}

struct TransferSignal {
    frame_ready: bool,
    shutdown: bool,
}

// Thread-safe framebuffer wrapper for handoff to the transfer thread
struct SharedFramebuffer {
    framebuffer: Arc<Mutex<Framebuffer>>,
    signal: Arc<(Mutex<TransferSignal>, Condvar)>,
}

impl SharedFramebuffer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: Arc::new(Mutex::new(Framebuffer::new(width, height))),
            signal: Arc::new((
                Mutex::new(TransferSignal {
                    frame_ready: false,
                    shutdown: false,
                }),
                Condvar::new(),
            )),
        }
    }

    fn clone_for_transfer(
        &self,
    ) -> (
        Arc<Mutex<Framebuffer>>,
        Arc<(Mutex<TransferSignal>, Condvar)>,
    ) {
        (Arc::clone(&self.framebuffer), Arc::clone(&self.signal))
    }

    fn lock(&self) -> std::sync::MutexGuard<Framebuffer> {
        self.framebuffer.lock().unwrap()
    }

    fn signal_frame_ready(&self) {
        let (lock, cvar) = &*self.signal;
        let mut signal = lock.lock().unwrap();
        signal.frame_ready = true;
        cvar.notify_one();
    }

    fn signal_shutdown(&self) {
        let (lock, cvar) = &*self.signal;
        let mut signal = lock.lock().unwrap();
        signal.shutdown = true;
        cvar.notify_one();
    }
}

fn main() {
    // It is necessary to call this function once. Otherwise, some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("erhu tuner starting (esp32)");

    let peripherals = SystemPeripherals::take();

    let mut keys = KeyDriver::new(peripherals.keys);
    let mut speaker = EspSpeaker::new(peripherals.speaker);

    let display = peripherals.display;
    let mut backlight_pin = PinDriver::output(display.backlight).unwrap();
    backlight_pin.set_high().unwrap();

    log::info!("Configuring SPI with DMA...");

    let spi_driver = SpiDriver::new(
        display.spi,
        display.sclk,
        display.sdo,
        Some(display.sdi),
        &SpiDriverConfig::new().dma(Dma::Auto(32768)),
    )
    .unwrap();

    // ST7789 handles up to 80 MHz
    let config = esp_idf_hal::spi::config::Config::new().baudrate(80.MHz().into());
    let spi_device = SpiDeviceDriver::new(spi_driver, Some(display.cs), &config).unwrap();

    let dc_pin = PinDriver::output(display.control.dc).unwrap();
    let rst_pin = PinDriver::output(display.control.rst).unwrap();

    let shared_fb = SharedFramebuffer::new(consts::WIDTH, consts::HEIGHT);
    let (fb_arc, signal_arc) = shared_fb.clone_for_transfer();

    log::info!("Spawning display transfer thread...");

    thread::Builder::new()
        .name("display_transfer".to_string())
        .stack_size(8192)
        .spawn(move || {
            // Create display interface with heap-allocated buffer
            let mut buffer = vec![0u8; 65535].into_boxed_slice();
            let di = SpiInterface::new(spi_device, dc_pin, &mut *buffer);

            let mut display = Builder::new(ST7789, di)
                .display_size(240, 280)
                .display_offset(0, 20)
                .orientation(Orientation::new().rotate(Rotation::Deg90))
                .invert_colors(ColorInversion::Inverted)
                .reset_pin(rst_pin)
                .init(&mut FreeRtos)
                .unwrap();

            if let Err(e) = display.clear(Rgb565::BLACK) {
                log::error!("display clear error: {:?}", e);
            }
            log::info!("Display initialized in transfer thread");

            // the frame lands pixel-doubled in the panel center
            let blit_area = Rectangle::new(
                Point::new(
                    ((PANEL_WIDTH - consts::WIDTH * SCALE) / 2) as i32,
                    ((PANEL_HEIGHT - consts::HEIGHT * SCALE) / 2) as i32,
                ),
                Size::new(consts::WIDTH * SCALE, consts::HEIGHT * SCALE),
            );

            let (signal_lock, cvar) = &*signal_arc;

            loop {
                // Wait for a frame (or shutdown) from the main thread
                let mut signal = signal_lock.lock().unwrap();
                while !signal.frame_ready && !signal.shutdown {
                    signal = cvar.wait(signal).unwrap();
                }
                if signal.shutdown {
                    break;
                }
                signal.frame_ready = false;
                drop(signal); // release before the transfer

                let fb = fb_arc.lock().unwrap();
                if let Err(e) = display.fill_contiguous(&blit_area, fb.iter_scaled()) {
                    log::error!("display transfer error: {:?}", e);
                }
            }

            // blank the panel on the way out
            if let Err(e) = display.clear(Rgb565::BLACK) {
                log::error!("display clear error: {:?}", e);
            }
            log::info!("display transfer thread exiting");
        })
        .expect("Failed to spawn display transfer thread");

    let mut app = App::new();
    log::info!("entering main loop");

    while app.running() {
        keys.poll(consts::IDLE_POLL_MS, |event| {
            app.handle_key(event, &mut speaker);
        });

        {
            let mut fb = shared_fb.lock();
            if let Err(e) = app.render(&mut *fb) {
                log::error!("render error: {:?}", e);
            }
        }
        shared_fb.signal_frame_ready();

        FreeRtos::delay_ms(consts::IDLE_POLL_MS);
    }

    // single exit path: tone off, speaker released, display blanked
    app.shutdown(&mut speaker);
    shared_fb.signal_shutdown();
    backlight_pin.set_low().unwrap();
    log::info!("erhu tuner exiting");
}
