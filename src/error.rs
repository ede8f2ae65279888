//! Zero or more errors can occur during a conversion. This module declares
//! the crate's error type and result alias.
use crate::typedef::NiftiType;
use std::io::Error as IOError;

quick_error! {
    /// Error type for all conversion operations in this crate.
    #[derive(Debug)]
    pub enum ConvertError {
        /// A field required by the record schema is absent
        MissingField(name: &'static str) {
            display("missing required field `{}`", name)
        }
        /// Could not retrieve a volume or mesh field code
        InvalidCode(typename: &'static str, code: i16) {
            display("invalid code `{}` for {}", code, typename)
        }
        /// Unsupported data type
        UnsupportedDataType(t: NiftiType) {
            display("unsupported data type {:?}", t)
        }
        /// A numeric buffer uses an element representation outside the
        /// supported set
        UnsupportedBufferType(repr: String) {
            display("unsupported numeric buffer representation: {}", repr)
        }
        /// A cell record declares a topology below the supported minimum
        UnsupportedCellTopology(cell_type: u32, cell_count: u32) {
            display("unsupported cell topology: type {} with {} vertices", cell_type, cell_count)
        }
        /// The voxel payload length disagrees with the length implied by the
        /// image dimensions and data type
        PayloadSizeMismatch(expected: usize, actual: usize) {
            display("voxel payload of {} bytes, expected {} bytes", actual, expected)
        }
        /// Read a record which does not abide by the expected layout
        InvalidFormat(reason: String) {
            display("invalid record: {}", reason)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("{}", err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, ConvertError>;
