use crate::resource::{ResourceId, ResourceKind};

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{} is required but missing.", _0)]
    NullResource(String),
    #[fail(display = "Invalid size: {}.", _0)]
    InvalidSize(String),
    #[fail(display = "Range [{}, {}) is out of [0, {}).", offset, end, capacity)]
    Range {
        offset: usize,
        end: usize,
        capacity: usize,
    },
    #[fail(display = "{:?} {} is not mapped.", _0, _1)]
    NotMapped(ResourceKind, ResourceId),
    #[fail(display = "{:?} {} is already mapped.", _0, _1)]
    AlreadyMapped(ResourceKind, ResourceId),
    #[fail(display = "{:?} is not supported by the active backend.", _0)]
    UnsupportedKind(ResourceKind),
    #[fail(display = "Uniform({:?}) is undefined in the bound shader.", _0)]
    UniformNotFound(String),
    #[fail(display = "Invalid state: {}.", _0)]
    InvalidState(String),
    #[fail(display = "Cannot operate on an untyped buffer {}.", _0)]
    InvalidBufferType(ResourceId),
    #[fail(display = "Backend: {}", _0)]
    Backend(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// Checks that `[offset, offset + size)` lies inside `[0, capacity)`.
    pub(crate) fn check_range(offset: usize, size: usize, capacity: usize) -> Result<()> {
        let end = offset.checked_add(size).unwrap_or(usize::max_value());
        if size == 0 || end > capacity {
            return Err(Error::Range {
                offset,
                end,
                capacity,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn range() {
        assert!(Error::check_range(0, 16, 16).is_ok());
        assert!(Error::check_range(8, 8, 16).is_ok());
        assert!(Error::check_range(8, 9, 16).is_err());
        assert!(Error::check_range(0, 0, 16).is_err());
        assert!(Error::check_range(usize::max_value(), 2, 16).is_err());
    }

    #[test]
    fn display() {
        let err = Error::UniformNotFound("u_Color".into());
        assert_eq!(
            format!("{}", err),
            "Uniform(\"u_Color\") is undefined in the bound shader."
        );
    }
}
