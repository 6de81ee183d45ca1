#![cfg_attr(not(test), no_std)]

use arbitrary_int::{u2, u3, u4};
use bitbybit::{bitenum, bitfield};
use embedded_hal::spi::{self, Operation, SpiDevice};
use num_enum::IntoPrimitive;

#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Command {
    Wakeup = 0x00,
    Sleep = 0x02,
    Sync = 0x04,
    Reset = 0x06,
    Rdata = 0x12,
    Rdatac = 0x14,
    Sdatac = 0x16,
    Rreg = 0x20,
    Wreg = 0x40,
    Sysocal = 0x60,
    Sysgcal = 0x61,
    Selfocal = 0x62,
    Nop = 0xff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Addr {
    Mux0 = 0x00,
    Vbias = 0x01,
    Mux1 = 0x02,
    Sys0 = 0x03,
    Ofc0 = 0x04,
    Ofc1 = 0x05,
    Ofc2 = 0x06,
    Fsc0 = 0x07,
    Fsc1 = 0x08,
    Fsc2 = 0x09,
    Idac0 = 0x0a,
    Idac1 = 0x0b,
    GpioCfg = 0x0c,
    GpioDir = 0x0d,
    GpioDat = 0x0e,
}

/// Input multiplexer. `mux_sp`/`mux_sn` select AIN0..AIN7.
#[bitfield(u8, default = 0x01)]
#[derive(Debug, PartialEq)]
pub struct Mux0 {
    #[bits(0..=2, rw)]
    pub mux_sn: u3,
    #[bits(3..=5, rw)]
    pub mux_sp: u3,
    /// Burn-out current source
    #[bits(6..=7, rw)]
    pub bcs: u2,
}

#[bitfield(u8, default = 0x00)]
#[derive(Debug, PartialEq)]
pub struct Mux1 {
    #[bits(0..=2, rw)]
    pub muxcal: u3,
    /// 0: REF0, 1: REF1, 2: internal, 3: internal to REF0
    #[bits(3..=4, rw)]
    pub refselt: u2,
    /// 0: off, 1: on, 2/3: on in conversion only
    #[bits(5..=6, rw)]
    pub vrefcon: u2,
    #[bit(7, r)]
    pub clkstat: bool,
}

#[bitenum(u3, exhaustive = true)]
#[derive(Debug, PartialEq)]
pub enum Gain {
    G1 = 0,
    G2 = 1,
    G4 = 2,
    G8 = 3,
    G16 = 4,
    G32 = 5,
    G64 = 6,
    G128 = 7,
}

impl Gain {
    pub const fn value(self) -> u8 {
        1 << self as u8
    }
}

/// Output data rate code, `dr` field of SYS0.
pub mod rate {
    use arbitrary_int::u4;

    pub const SPS_5: u4 = u4::new(0b0000);
    pub const SPS_10: u4 = u4::new(0b0001);
    pub const SPS_20: u4 = u4::new(0b0010);
    pub const SPS_40: u4 = u4::new(0b0011);
    pub const SPS_80: u4 = u4::new(0b0100);
}

#[bitfield(u8, default = 0x00)]
#[derive(Debug, PartialEq)]
pub struct Sys0 {
    #[bits(0..=3, rw)]
    pub dr: u4,
    #[bits(4..=6, rw)]
    pub pga: Gain,
}

#[bitenum(u3, exhaustive = true)]
#[derive(Debug, PartialEq)]
pub enum IdacCurrent {
    Off = 0,
    Ua50 = 1,
    Ua100 = 2,
    Ua250 = 3,
    Ua500 = 4,
    Ua750 = 5,
    Ua1000 = 6,
    Ua1500 = 7,
}

#[bitfield(u8, default = 0x90)]
#[derive(Debug, PartialEq)]
pub struct Idac0 {
    #[bits(0..=2, rw)]
    pub imag: IdacCurrent,
    /// DOUT/DRDY pin doubles as data ready
    #[bit(3, rw)]
    pub drdy_mode: bool,
    #[bits(4..=7, r)]
    pub id: u4,
}

/// Excitation current routing. 0..=7 are AIN0..AIN7, 8/9 IEXC1/IEXC2, 12..=15 off.
#[bitfield(u8, default = 0xff)]
#[derive(Debug, PartialEq)]
pub struct Idac1 {
    #[bits(0..=3, rw)]
    pub i2dir: u4,
    #[bits(4..=7, rw)]
    pub i1dir: u4,
}

impl Idac1 {
    /// Swap the two excitation current outputs.
    pub fn chopped(self) -> Self {
        Self::new_with_raw_value(0)
            .with_i1dir(self.i2dir())
            .with_i2dir(self.i1dir())
    }
}

/// Conversion control registers MUX0..SYS0 and IDAC0..IDAC1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub mux0: Mux0,
    pub vbias: u8,
    pub mux1: Mux1,
    pub sys0: Sys0,
    pub idac0: Idac0,
    pub idac1: Idac1,
}

impl Default for Config {
    /// Power-on register values.
    fn default() -> Self {
        Self {
            mux0: Mux0::default(),
            vbias: 0,
            mux1: Mux1::default(),
            sys0: Sys0::default(),
            idac0: Idac0::default(),
            idac1: Idac1::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("SPI")]
    Bus(spi::ErrorKind),
}

impl<E: spi::Error> From<E> for Error {
    fn from(value: E) -> Self {
        Self::Bus(value.kind())
    }
}

/// Sign extend a big endian 16 bit two's complement conversion result.
pub fn code_from_be_bytes(data: [u8; 2]) -> i32 {
    i16::from_be_bytes(data) as i32
}

#[derive(Clone, Debug)]
pub struct Ads1148<B> {
    bus: B,
}

impl<B: SpiDevice<u8>> Ads1148<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn command(&mut self, command: Command) -> Result<(), Error> {
        Ok(self.bus.write(&[u8::from(command)])?)
    }

    /// Needs 0.6 ms before further communication.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.command(Command::Reset)
    }

    /// Stop continuous read mode so that register access is possible.
    pub fn stop_continuous(&mut self) -> Result<(), Error> {
        self.command(Command::Sdatac)
    }

    pub fn sync(&mut self) -> Result<(), Error> {
        self.command(Command::Sync)
    }

    pub fn write_registers(
        &mut self,
        addr: Addr,
        data: &[u8],
    ) -> Result<(), Error> {
        debug_assert!(!data.is_empty() && data.len() <= 16);
        Ok(self.bus.transaction(&mut [
            Operation::Write(&[
                u8::from(Command::Wreg) | u8::from(addr),
                data.len() as u8 - 1,
            ]),
            Operation::Write(data),
        ])?)
    }

    pub fn read_registers(
        &mut self,
        addr: Addr,
        data: &mut [u8],
    ) -> Result<(), Error> {
        debug_assert!(!data.is_empty() && data.len() <= 16);
        Ok(self.bus.transaction(&mut [
            Operation::Write(&[
                u8::from(Command::Rreg) | u8::from(addr),
                data.len() as u8 - 1,
            ]),
            Operation::Read(data),
        ])?)
    }

    /// Rewrite all conversion control registers and restart the conversion
    /// (SYNC) within one chip select assertion.
    pub fn configure(&mut self, config: &Config) -> Result<(), Error> {
        Ok(self.bus.transaction(&mut [
            Operation::Write(&[
                u8::from(Command::Wreg) | u8::from(Addr::Mux0),
                3,
            ]),
            Operation::Write(&[
                config.mux0.raw_value(),
                config.vbias,
                config.mux1.raw_value(),
                config.sys0.raw_value(),
            ]),
            Operation::Write(&[
                u8::from(Command::Wreg) | u8::from(Addr::Idac0),
                1,
            ]),
            Operation::Write(&[
                config.idac0.raw_value(),
                config.idac1.raw_value(),
            ]),
            Operation::Write(&[u8::from(Command::Sync)]),
        ])?)
    }

    /// Read the latest conversion result (RDATA).
    pub fn read_data(&mut self) -> Result<i32, Error> {
        let mut data = [0; 2];
        self.bus.transaction(&mut [
            Operation::Write(&[u8::from(Command::Rdata)]),
            Operation::Read(&mut data),
        ])?;
        Ok(code_from_be_bytes(data))
    }
}
