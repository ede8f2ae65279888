#![no_main]
use itkwasm_nifti::NiftiHeader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = NiftiHeader::from_reader(data) {
        let _ = header.rank();
        let _ = header.data_type();
        let _ = header.affine();
    }
});
