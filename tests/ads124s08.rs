use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::{
    digital::{Mock as PinMock, State as PinState, Transaction as Pin},
    spi::{Mock as SpiMock, Transaction as Spi},
};

use rtdaq::{
    acquisition::{MeasurementQuery, QueryAttributes, Status},
    hardware::{Adc, Ads124s08Adc},
    sensor::ProbeType,
    time::ManualClock,
    Error,
};

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

fn query(ch: u8, probe: ProbeType, readings: u32) -> MeasurementQuery {
    MeasurementQuery {
        global_channel_id: ch as usize,
        adc_id: 0,
        adc_channel_id: ch,
        probe,
        num_of_readings: readings,
        attributes: QueryAttributes::default(),
    }
}

fn write(data: &[u8]) -> [Spi<u8>; 3] {
    [
        Spi::transaction_start(),
        Spi::write_vec(data.to_vec()),
        Spi::transaction_end(),
    ]
}

fn power_up() -> Vec<Spi<u8>> {
    let mut t = write(&[0x06]).to_vec();
    t.extend([
        Spi::transaction_start(),
        Spi::write_vec(vec![0x42, 0x07]),
        Spi::write_vec(vec![0x12, 0x0a, 0xb2, 0x02, 0x05, 0x03, 0x00, 0x10]),
        Spi::transaction_end(),
    ]);
    t
}

struct Fixture {
    spi: SpiMock<u8>,
    start: PinMock,
    reset: PinMock,
    drdy: PinMock,
}

impl Fixture {
    fn new(spi: &[Spi<u8>], drdy: &[Pin]) -> Self {
        Self {
            spi: SpiMock::new(spi),
            start: PinMock::new(&[Pin::set(PinState::Low)]),
            reset: PinMock::new(&[
                Pin::set(PinState::Low),
                Pin::set(PinState::High),
            ]),
            drdy: PinMock::new(drdy),
        }
    }

    fn adc<'a>(
        &self,
        clock: &'a ManualClock,
    ) -> Ads124s08Adc<SpiMock<u8>, PinMock, PinMock, &'a ManualClock> {
        Ads124s08Adc::new(
            0,
            self.start.clone(),
            self.reset.clone(),
            self.drdy.clone(),
            clock,
        )
    }

    fn done(mut self) {
        self.spi.done();
        self.start.done();
        self.reset.done();
        self.drdy.done();
    }
}

#[test]
fn uninitialized() {
    let clock = ManualClock::default();
    let mut pin = PinMock::new(&[]);
    let mut adc: Ads124s08Adc<SpiMock<u8>, _, _, _> =
        Ads124s08Adc::new(0, pin.clone(), pin.clone(), pin.clone(), &clock);
    assert!(!adc.is_initialized());
    assert_eq!(
        adc.measure(&query(0, ProbeType::Pt100, 1)),
        Err(Error::NotInitialized)
    );
    assert_eq!(
        adc.measure(&query(0, ProbeType::Pt100, 2)),
        Err(Error::NotInitialized)
    );
    assert!(adc.query_in_progress().is_none());
    pin.done();
}

#[test]
fn conversion_sequence() {
    let clock = ManualClock::new(1000);
    let mut spi = power_up();
    spi.extend([
        Spi::transaction_start(),
        Spi::write_vec(vec![0x42, 0x07]),
        Spi::write_vec(vec![0x12, 0x0c, 0xb2, 0x02, 0x05, 0x03, 0x00, 0x10]),
        Spi::transaction_end(),
    ]);
    spi.extend(write(&[0x08]));
    spi.extend([
        Spi::transaction_start(),
        Spi::write_vec(vec![0x12]),
        Spi::read_vec(vec![0xff, 0xff, 0xfe]),
        Spi::transaction_end(),
    ]);
    let f = Fixture::new(
        &spi,
        &[Pin::get(PinState::High), Pin::get(PinState::Low)],
    );
    let mut adc = f.adc(&clock);
    let bus = f.spi.clone();
    adc.initialize(|| bus.clone(), &mut NoDelay).unwrap();

    let q = query(0, ProbeType::Pt100, 1);
    let r = adc.measure(&q).unwrap();
    assert_eq!(r.status, Status::Accept);
    assert_eq!(r.query_in_progress, Some(q));

    // a different query while busy is ignored
    let other = query(2, ProbeType::Pt1000, 1);
    clock.advance(275);
    let r = adc.measure(&other).unwrap();
    assert_eq!(r.status, Status::ConversionTimeout);
    assert_eq!(r.query_in_progress, Some(q));
    assert_eq!(adc.query_in_progress(), Some(&q));

    clock.advance(1);
    let r = adc.measure(&q).unwrap();
    assert_eq!(r.status, Status::WaitingForConversion);

    let r = adc.measure(&q).unwrap();
    assert_eq!(r.status, Status::DataReady);
    assert_eq!(r.query_in_progress, Some(q));
    assert_eq!(r.readings.unwrap().as_slice(), &[-2]);
    assert!(adc.query_in_progress().is_none());
    f.done();
}

#[test]
fn refuses_bulk_queries() {
    let f = Fixture::new(&power_up(), &[]);
    let clock = ManualClock::default();
    let mut adc = f.adc(&clock);
    let bus = f.spi.clone();
    adc.initialize(|| bus.clone(), &mut NoDelay).unwrap();

    for readings in [0, 2] {
        let r = adc.measure(&query(1, ProbeType::Pt100, readings)).unwrap();
        assert_eq!(r.status, Status::Refuse);
        assert!(r.query_in_progress.is_none());
        assert!(!r.message.unwrap().is_empty());
        assert!(adc.query_in_progress().is_none());
    }
    f.done();
}

#[test]
fn rejects_invalid_queries() {
    let f = Fixture::new(&power_up(), &[]);
    let clock = ManualClock::default();
    let mut adc = f.adc(&clock);
    let bus = f.spi.clone();
    adc.initialize(|| bus.clone(), &mut NoDelay).unwrap();

    assert_eq!(
        adc.measure(&query(3, ProbeType::Pt100, 1)),
        Err(Error::InvalidChannel(3))
    );
    let mut q = query(0, ProbeType::Pt100, 1);
    q.adc_id = 1;
    assert_eq!(adc.measure(&q), Err(Error::InvalidAdc(1)));
    assert!(adc.query_in_progress().is_none());
    f.done();
}
