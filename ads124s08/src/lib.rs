#![cfg_attr(not(test), no_std)]

use arbitrary_int::{u2, u3, u4};
use bitbybit::{bitenum, bitfield};
use embedded_hal::spi::{self, Operation, SpiDevice};
use num_enum::IntoPrimitive;

#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Command {
    Nop = 0x00,
    Wakeup = 0x02,
    Powerdown = 0x04,
    Reset = 0x06,
    Start = 0x08,
    Stop = 0x0a,
    Rdata = 0x12,
    Syocal = 0x16,
    Sygcal = 0x17,
    Sfocal = 0x19,
    Rreg = 0x20,
    Wreg = 0x40,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Addr {
    Id = 0x00,
    Status = 0x01,
    InpMux = 0x02,
    Pga = 0x03,
    DataRate = 0x04,
    Ref = 0x05,
    IdacMag = 0x06,
    IdacMux = 0x07,
    Vbias = 0x08,
    Sys = 0x09,
    Ofcal0 = 0x0a,
    Ofcal1 = 0x0b,
    Ofcal2 = 0x0c,
    Fscal0 = 0x0d,
    Fscal1 = 0x0e,
    Fscal2 = 0x0f,
    GpioDat = 0x10,
    GpioCon = 0x11,
}

/// Analog input selection. 0..=11 are AIN0..AIN11, 12 is AINCOM.
#[bitfield(u8, default = 0x01)]
#[derive(Debug, PartialEq)]
pub struct InpMux {
    #[bits(0..=3, rw)]
    pub muxn: u4,
    #[bits(4..=7, rw)]
    pub muxp: u4,
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

#[bitenum(u2, exhaustive = true)]
#[derive(Debug, PartialEq)]
pub enum PgaEnable {
    Bypassed = 0,
    Enabled = 1,
    _Reserved2 = 2,
    _Reserved3 = 3,
}

#[bitfield(u8, default = 0x00)]
#[derive(Debug, PartialEq)]
pub struct Pga {
    #[bits(0..=2, rw)]
    pub gain: Gain,
    #[bits(3..=4, rw)]
    pub pga_en: PgaEnable,
    #[bits(5..=7, rw)]
    pub delay: u3,
}

/// Output data rate code, `dr` field of the DATARATE register.
pub mod rate {
    use arbitrary_int::u4;

    pub const SPS_2_5: u4 = u4::new(0b0000);
    pub const SPS_5: u4 = u4::new(0b0001);
    pub const SPS_10: u4 = u4::new(0b0010);
    pub const SPS_16_6: u4 = u4::new(0b0011);
    pub const SPS_20: u4 = u4::new(0b0100);
    pub const SPS_50: u4 = u4::new(0b0101);
    pub const SPS_60: u4 = u4::new(0b0110);
    pub const SPS_100: u4 = u4::new(0b0111);
}

#[bitfield(u8, default = 0x14)]
#[derive(Debug, PartialEq)]
pub struct DataRate {
    #[bits(0..=3, rw)]
    pub dr: u4,
    #[bit(4, rw)]
    pub low_latency: bool,
    #[bit(5, rw)]
    pub single_shot: bool,
    #[bit(6, rw)]
    pub external_clock: bool,
    #[bit(7, rw)]
    pub global_chop: bool,
}

#[bitfield(u8, default = 0x10)]
#[derive(Debug, PartialEq)]
pub struct Ref {
    /// 0: off, 1: on but powered down in standby, 2: always on
    #[bits(0..=1, rw)]
    pub refcon: u2,
    /// 0: REFP0/REFN0, 1: REFP1/REFN1, 2: internal
    #[bits(2..=3, rw)]
    pub refsel: u2,
    #[bit(4, rw)]
    pub refn_buf_bypass: bool,
    #[bit(5, rw)]
    pub refp_buf_bypass: bool,
    #[bits(6..=7, rw)]
    pub fl_ref_en: u2,
}

/// Excitation current magnitude, `imag` field of IDACMAG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IdacCurrent {
    Off = 0,
    Ua10 = 1,
    Ua50 = 2,
    Ua100 = 3,
    Ua250 = 4,
    Ua500 = 5,
    Ua750 = 6,
    Ua1000 = 7,
    Ua1500 = 8,
    Ua2000 = 9,
}

impl From<IdacCurrent> for u4 {
    fn from(value: IdacCurrent) -> Self {
        u4::new(value as u8)
    }
}

#[bitfield(u8, default = 0x00)]
#[derive(Debug, PartialEq)]
pub struct IdacMag {
    #[bits(0..=3, rw)]
    pub imag: u4,
    #[bit(6, rw)]
    pub psw: bool,
    #[bit(7, rw)]
    pub fl_rail_en: bool,
}

/// IDAC output pin selection. 0..=11 are AIN0..AIN11, 12 AINCOM, 13..=15 off.
#[bitfield(u8, default = 0xff)]
#[derive(Debug, PartialEq)]
pub struct IdacMux {
    #[bits(0..=3, rw)]
    pub i1mux: u4,
    #[bits(4..=7, rw)]
    pub i2mux: u4,
}

#[bitfield(u8, default = 0x10)]
#[derive(Debug, PartialEq)]
pub struct Sys {
    #[bit(0, rw)]
    pub sendstat: bool,
    #[bit(1, rw)]
    pub crc: bool,
    #[bit(2, rw)]
    pub timeout: bool,
    /// 0: 1, 1: 4, 2: 8, 3: 16 samples
    #[bits(3..=4, rw)]
    pub cal_samp: u2,
    #[bits(5..=7, rw)]
    pub sys_mon: u3,
}

/// The contiguous conversion control block INPMUX..SYS.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub inpmux: InpMux,
    pub pga: Pga,
    pub datarate: DataRate,
    pub reference: Ref,
    pub idacmag: IdacMag,
    pub idacmux: IdacMux,
    pub vbias: u8,
    pub sys: Sys,
}

impl Config {
    pub const START: Addr = Addr::InpMux;

    pub fn to_bytes(&self) -> [u8; 8] {
        [
            self.inpmux.raw_value(),
            self.pga.raw_value(),
            self.datarate.raw_value(),
            self.reference.raw_value(),
            self.idacmag.raw_value(),
            self.idacmux.raw_value(),
            self.vbias,
            self.sys.raw_value(),
        ]
    }
}

impl Default for Config {
    /// Power-on register values.
    fn default() -> Self {
        Self {
            inpmux: InpMux::default(),
            pga: Pga::default(),
            datarate: DataRate::default(),
            reference: Ref::default(),
            idacmag: IdacMag::default(),
            idacmux: IdacMux::default(),
            vbias: 0,
            sys: Sys::default(),
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

/// Sign extend a big endian 24 bit two's complement conversion result.
pub fn code_from_be_bytes(data: [u8; 3]) -> i32 {
    i32::from_be_bytes([data[0], data[1], data[2], 0]) >> 8
}

#[derive(Clone, Debug)]
pub struct Ads124s08<B> {
    bus: B,
}

impl<B: SpiDevice<u8>> Ads124s08<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn command(&mut self, command: Command) -> Result<(), Error> {
        Ok(self.bus.write(&[u8::from(command)])?)
    }

    /// Needs 4096 t_CLK (~1 ms) before further communication.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.command(Command::Reset)
    }

    pub fn start(&mut self) -> Result<(), Error> {
        self.command(Command::Start)
    }

    pub fn write_registers(
        &mut self,
        addr: Addr,
        data: &[u8],
    ) -> Result<(), Error> {
        debug_assert!(!data.is_empty() && data.len() <= 32);
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
        debug_assert!(!data.is_empty() && data.len() <= 32);
        Ok(self.bus.transaction(&mut [
            Operation::Write(&[
                u8::from(Command::Rreg) | u8::from(addr),
                data.len() as u8 - 1,
            ]),
            Operation::Read(data),
        ])?)
    }

    /// Rewrite the full conversion control block.
    pub fn configure(&mut self, config: &Config) -> Result<(), Error> {
        self.write_registers(Config::START, &config.to_bytes())
    }

    /// Read the latest conversion result (RDATA).
    pub fn read_data(&mut self) -> Result<i32, Error> {
        let mut data = [0; 3];
        self.bus.transaction(&mut [
            Operation::Write(&[u8::from(Command::Rdata)]),
            Operation::Read(&mut data),
        ])?;
        Ok(code_from_be_bytes(data))
    }
}
