/// Semantic validation run on decoded inputs and on outputs before they are
/// serialized.
///
/// The default accepts everything. An input that fails becomes a
/// `ValidationError` (400); an output that fails becomes an `InternalError`
/// (500), since the operation produced something it should not have.
///
/// ```rust
/// use opsrouter::operation::Validate;
///
/// struct Quantity(u32);
///
/// impl Validate for Quantity {
///     fn validate(&self) -> Result<(), String> {
///         if self.0 == 0 {
///             return Err("quantity must be positive".to_string());
///         }
///         Ok(())
///     }
/// }
///
/// assert!(Quantity(0).validate().is_err());
/// assert!(Quantity(3).validate().is_ok());
/// ```
pub trait Validate {
    /// Check the value.
    ///
    /// # Errors
    ///
    /// Returns the reason the value is not acceptable.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

macro_rules! always_valid {
    ($($ty:ty),* $(,)?) => {
        $(impl Validate for $ty {})*
    };
}

always_valid!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    serde_json::Value,
);

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Result<(), String> {
        match self {
            Some(value) => value.validate(),
            None => Ok(()),
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        self.iter().try_for_each(Validate::validate)
    }
}

impl<T: Validate + ?Sized> Validate for Box<T> {
    fn validate(&self) -> Result<(), String> {
        (**self).validate()
    }
}
