use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiBus};

use super::panel::{CMD_CLEAR, CMD_WRITE, FrameBuffer, HEIGHT, LINE_BYTES, VCOM_BIT, line_address};

const CS_SETUP_NS: u32 = 3_000;
const CS_HOLD_NS: u32 = 1_000;
const CLEAR_HOLD_NS: u32 = 220_000;
const POWER_ON_US: u32 = 60;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DisplayError<SpiErr, DispErr, EmdErr, CsErr> {
    Spi(SpiErr),
    Disp(DispErr),
    Emd(EmdErr),
    Cs(CsErr),
}

pub type SharpDisplayResult<SpiErr, DispErr, EmdErr, CsErr> =
    Result<(), DisplayError<SpiErr, DispErr, EmdErr, CsErr>>;

/// Serial driver for the Sharp memory LCD with software VCOM toggling.
///
/// `DISP` gates panel output and stands in for a backlight: the panel has
/// none, and driving DISP low blanks it while RAM contents are kept.
#[derive(Debug)]
pub struct SharpDisplay<SPI, DISP, EMD, CS, D> {
    spi: SPI,
    disp: DISP,
    emd: EMD,
    cs: CS,
    delay: D,
    vcom_high: bool,
}

impl<SPI, DISP, EMD, CS, D> SharpDisplay<SPI, DISP, EMD, CS, D>
where
    SPI: SpiBus<u8>,
    DISP: OutputPin,
    EMD: OutputPin,
    CS: OutputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, disp: DISP, emd: EMD, cs: CS, delay: D) -> Self {
        Self {
            spi,
            disp,
            emd,
            cs,
            delay,
            vcom_high: false,
        }
    }

    pub fn initialize(&mut self) -> SharpDisplayResult<SPI::Error, DISP::Error, EMD::Error, CS::Error> {
        self.emd.set_low().map_err(DisplayError::Emd)?;
        self.cs.set_low().map_err(DisplayError::Cs)?;
        self.set_output(true)?;
        self.delay.delay_us(POWER_ON_US);
        Ok(())
    }

    pub fn set_output(
        &mut self,
        on: bool,
    ) -> SharpDisplayResult<SPI::Error, DISP::Error, EMD::Error, CS::Error> {
        if on {
            self.disp.set_high().map_err(DisplayError::Disp)
        } else {
            self.disp.set_low().map_err(DisplayError::Disp)
        }
    }

    pub fn clear_all(&mut self) -> SharpDisplayResult<SPI::Error, DISP::Error, EMD::Error, CS::Error> {
        let mode = CMD_CLEAR | self.next_vcom();
        self.transaction(CLEAR_HOLD_NS, |spi| spi.write(&[mode, 0x00, 0x00]))
    }

    /// Writes every line of `frame` in one chip-select window.
    pub fn flush_frame(
        &mut self,
        frame: &FrameBuffer,
    ) -> SharpDisplayResult<SPI::Error, DISP::Error, EMD::Error, CS::Error> {
        let mode = CMD_WRITE | self.next_vcom();
        self.transaction(CS_HOLD_NS, |spi| {
            spi.write(&[mode])?;
            // [address][payload][dummy]
            let mut packet = [0u8; LINE_BYTES + 2];
            for row in 0..HEIGHT {
                packet[0] = line_address(row);
                packet[1..=LINE_BYTES].copy_from_slice(frame.row(row));
                spi.write(&packet)?;
            }
            spi.write(&[0x00])
        })
    }

    fn next_vcom(&mut self) -> u8 {
        self.vcom_high = !self.vcom_high;
        if self.vcom_high { VCOM_BIT } else { 0 }
    }

    fn transaction(
        &mut self,
        hold_ns: u32,
        body: impl FnOnce(&mut SPI) -> Result<(), SPI::Error>,
    ) -> SharpDisplayResult<SPI::Error, DISP::Error, EMD::Error, CS::Error> {
        self.cs.set_high().map_err(DisplayError::Cs)?;
        self.delay.delay_ns(CS_SETUP_NS);
        let written = body(&mut self.spi).and_then(|_| self.spi.flush());
        self.delay.delay_ns(hold_ns);
        self.cs.set_low().map_err(DisplayError::Cs)?;
        written.map_err(DisplayError::Spi)
    }
}
