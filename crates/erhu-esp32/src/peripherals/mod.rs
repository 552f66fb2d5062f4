mod key_driver;
mod speaker;

pub use key_driver::KeyDriver;
pub use speaker::EspSpeaker;

use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi;

pub struct SystemPeripherals<SPI> {
    pub keys: KeyPeripherals,
    pub display: DisplaySpiPeripherals<SPI>,
    pub speaker: SpeakerPeripherals<
        esp_idf_hal::ledc::TIMER0,
        esp_idf_hal::ledc::CHANNEL0,
        esp_idf_hal::gpio::Gpio9,
    >,
}

/// Key GPIO pins
/// Active low (directly connected to GND when pressed)
pub struct KeyPeripherals {
    pub key_ok: AnyInputPin,    // GPIO15
    pub key_back: AnyInputPin,  // GPIO7
    pub key_up: AnyInputPin,    // GPIO8
    pub key_down: AnyInputPin,  // GPIO18
    pub key_left: AnyInputPin,  // GPIO17
    pub key_right: AnyInputPin, // GPIO16
}

pub struct DisplayControlPeripherals {
    pub dc: AnyOutputPin,
    pub rst: AnyOutputPin,
}

pub struct DisplaySpiPeripherals<SPI> {
    pub control: DisplayControlPeripherals,
    pub spi: SPI,
    pub sclk: AnyOutputPin,
    pub sdo: AnyOutputPin,
    pub sdi: AnyInputPin,
    pub cs: AnyOutputPin,
    pub backlight: AnyOutputPin,
}

/// Speaker LEDC timer, channel and output pin
pub struct SpeakerPeripherals<T, C, P> {
    pub timer: T,
    pub channel: C,
    pub pin: P,
}

impl SystemPeripherals<spi::SPI2> {
    pub fn take() -> Self {
        let peripherals = Peripherals::take().unwrap();

        SystemPeripherals {
            keys: KeyPeripherals {
                key_ok: peripherals.pins.gpio15.into(),
                key_back: peripherals.pins.gpio7.into(),
                key_up: peripherals.pins.gpio8.into(),
                key_down: peripherals.pins.gpio18.into(),
                key_left: peripherals.pins.gpio17.into(),
                key_right: peripherals.pins.gpio16.into(),
            },
            display: DisplaySpiPeripherals {
                control: DisplayControlPeripherals {
                    dc: peripherals.pins.gpio41.into(),
                    rst: peripherals.pins.gpio39.into(),
                },
                spi: peripherals.spi2,
                sclk: peripherals.pins.gpio37.into(),
                sdo: peripherals.pins.gpio38.into(),
                sdi: peripherals.pins.gpio14.into(),
                cs: peripherals.pins.gpio42.into(),
                backlight: peripherals.pins.gpio48.into(),
            },
            speaker: SpeakerPeripherals {
                timer: peripherals.ledc.timer0,
                channel: peripherals.ledc.channel0,
                pin: peripherals.pins.gpio9,
            },
        }
    }
}
