//! Builds a `windows_sys::core::GUID` from its canonical 11-field literal
//! form, the way the USB device-interface class GUIDs are usually quoted in
//! vendor documentation.

macro_rules! guid {
    ($d1:expr, $d2:expr, $d3:expr, $d4_0:expr, $d4_1:expr, $d4_2:expr, $d4_3:expr, $d4_4:expr, $d4_5:expr, $d4_6:expr, $d4_7:expr) => {
        windows_sys::core::GUID {
            data1: $d1,
            data2: $d2,
            data3: $d3,
            data4: [$d4_0, $d4_1, $d4_2, $d4_3, $d4_4, $d4_5, $d4_6, $d4_7],
        }
    };
}

pub(crate) use guid;
