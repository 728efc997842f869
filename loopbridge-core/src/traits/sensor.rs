/// A raw analog-to-digital converter channel.
///
/// Returns unscaled converter counts; calibration to engineering units
/// happens in the controller.
#[allow(async_fn_in_trait)]
pub trait RawAdc {
    type Error;

    async fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// A sensor that produces one raw value per sample request.
///
/// The registry in the driver crate maps configured sensor ids to
/// implementations of this trait.
#[allow(async_fn_in_trait)]
pub trait SensorSource {
    type Error;

    /// One-time device bring-up.
    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Take one reading, raw units.
    async fn sample(&mut self) -> Result<f64, Self::Error>;
}
