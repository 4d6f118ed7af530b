//! Waveshare 2.13" (B/C) three-colour panel over spidev and gpio-cdev.
//!
//! The controller is portrait (104×212), so the landscape canvas is rotated a
//! quarter turn into the bit planes. The controller treats a cleared red bit
//! as red, hence the inverted red plane.

use crate::canvas::{Canvas, InkyColor};
use crate::config::HardwareConfig;
use crate::display::{
    check_resolution, ColorPlanes, DisplayDriver, DisplayError, Resolution, Rotation,
};
use epd_waveshare::color::TriColor;
use epd_waveshare::epd2in13bc::Epd2in13bc;
use epd_waveshare::prelude::*;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
use std::fmt::Debug;

type Panel = Epd2in13bc<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

pub struct Epd2in13bcDisplay {
    spi: SpidevDevice,
    delay: Delay,
    epd: Panel,
    border: InkyColor,
}

fn hardware_error<E: Debug>(what: &'static str) -> impl FnOnce(E) -> DisplayError {
    move |e| DisplayError::Hardware(format!("{}: {:?}", what, e))
}

fn output_pin(chip: &mut Chip, offset: u32, consumer: &str) -> Result<CdevPin, DisplayError> {
    let handle = chip
        .get_line(offset)
        .map_err(hardware_error("getting GPIO line"))?
        .request(LineRequestFlags::OUTPUT, 0, consumer)
        .map_err(hardware_error("requesting output line"))?;
    CdevPin::new(handle).map_err(hardware_error("creating output pin"))
}

impl Epd2in13bcDisplay {
    /// Claim the SPI device and GPIO lines and initialise the controller.
    pub fn open(config: &HardwareConfig) -> Result<Self, DisplayError> {
        log::info!(
            "Opening panel on {} (DC {}, RST {}, BUSY {})",
            config.spi_device,
            config.dc_pin,
            config.rst_pin,
            config.busy_pin
        );

        let mut spi = SpidevDevice::open(&config.spi_device)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(4_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;

        let mut chip = Chip::new(&config.gpio_chip).map_err(hardware_error("opening GPIO chip"))?;
        let dc = output_pin(&mut chip, config.dc_pin, "inky-weather-dc")?;
        let rst = output_pin(&mut chip, config.rst_pin, "inky-weather-rst")?;
        let busy_handle = chip
            .get_line(config.busy_pin)
            .map_err(hardware_error("getting BUSY line"))?
            .request(LineRequestFlags::INPUT, 0, "inky-weather-busy")
            .map_err(hardware_error("requesting BUSY line"))?;
        let busy = CdevPin::new(busy_handle).map_err(hardware_error("creating BUSY pin"))?;

        let mut delay = Delay {};
        let epd = Epd2in13bc::new(&mut spi, busy, dc, rst, &mut delay, None)
            .map_err(hardware_error("initialising controller"))?;

        Ok(Self {
            spi,
            delay,
            epd,
            border: InkyColor::White,
        })
    }
}

impl DisplayDriver for Epd2in13bcDisplay {
    fn resolution(&self) -> Resolution {
        Resolution::Phat212x104
    }

    fn set_border(&mut self, color: InkyColor) {
        self.border = color;
    }

    fn show(&mut self, canvas: &Canvas) -> Result<(), DisplayError> {
        check_resolution(Resolution::Phat212x104, canvas)?;
        let planes = ColorPlanes::from_canvas(canvas, Rotation::Clockwise90);
        let border = match self.border {
            InkyColor::White => TriColor::White,
            InkyColor::Black => TriColor::Black,
            InkyColor::Red => TriColor::Chromatic,
        };

        self.epd
            .set_border_color(&mut self.spi, &mut self.delay, border)
            .map_err(hardware_error("setting border"))?;
        self.epd
            .update_color_frame(
                &mut self.spi,
                &mut self.delay,
                planes.black(),
                &planes.red_inverted(),
            )
            .map_err(hardware_error("sending frame"))?;
        self.epd
            .display_frame(&mut self.spi, &mut self.delay)
            .map_err(hardware_error("refreshing panel"))?;
        self.epd
            .sleep(&mut self.spi, &mut self.delay)
            .map_err(hardware_error("putting panel to sleep"))?;

        log::info!("Panel refreshed");
        Ok(())
    }
}
