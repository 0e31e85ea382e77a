use super::wide::to_wide;
use std::ffi::OsString;
use std::io;
use std::sync::mpsc::SyncSender;
use windows_sys::core::GUID;
use windows_sys::Win32::Foundation::{GetLastError, SetLastError, HANDLE, HMODULE, HWND, LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::Devices::DeviceAndDriverInstallation::*;
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::WindowsAndMessaging::*;

/// The name of our window class.
/// [See also](https://learn.microsoft.com/en-us/windows/win32/winmsg/about-window-classes)
pub(crate) const WINDOW_CLASS_NAME: *const u16 = windows_sys::w!("arduino-serialdiscovery");

/// Safety: name must be a null terminated wide string; user_data a pointer
/// handed to [`windows_sys::Win32::UI::WindowsAndMessaging::SetWindowLongPtrW`].
unsafe fn create_window(name: *const u16, user_data: isize) -> io::Result<HWND> {
    let handle = CreateWindowExW(
        0,
        WINDOW_CLASS_NAME,
        name,
        0,
        0,
        0,
        0,
        0,
        HWND_MESSAGE,
        std::ptr::null_mut(),
        hinstance(),
        std::ptr::null(),
    );
    if handle.is_null() {
        return Err(io::Error::last_os_error());
    }
    SetLastError(0);
    let prev = SetWindowLongPtrW(handle, GWLP_USERDATA, user_data);
    if prev == 0 {
        match GetLastError() {
            0 => Ok(handle),
            raw => Err(io::Error::from_raw_os_error(raw as i32)),
        }
    } else {
        Ok(handle)
    }
}

/// Window procedure: every `WM_DEVICECHANGE` is a non-blocking nudge onto the
/// single-slot coalescing channel. The exact device and action are not
/// inspected here — the reconciler re-enumerates and diffs, which is the
/// only way to get a consistent before/after pair anyway.
unsafe extern "system" fn window_proceedure(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const SyncSender<()>;
    match msg {
        WM_DEVICECHANGE if !ptr.is_null() => {
            let _ = (&*ptr).try_send(());
            0
        }
        WM_DESTROY => {
            if !ptr.is_null() {
                drop(Box::from_raw(ptr as *mut SyncSender<()>));
            }
            0
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Register the window class, create the message-only window, subscribe to
/// USB device-interface notifications, and pump messages until `WM_CLOSE`.
///
/// Safety: `tx` must be a valid pointer from `Box::into_raw`, not used again
/// by the caller; it is reclaimed on `WM_DESTROY`.
pub(crate) unsafe fn window_dispatcher(name: OsString, tx: *mut SyncSender<()>) -> io::Result<()> {
    const USB_DEVICE_INTERFACE_CLASS: GUID =
        super::guid::guid!(0x10BFDCA5, 0x3065, 0xD211, 0x90, 0x1F, 0x00, 0xC0, 0x4F, 0xB9, 0x51, 0xED);

    let class = WNDCLASSEXW {
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        style: 0,
        lpfnWndProc: Some(window_proceedure),
        cbClsExtra: 0,
        cbWndExtra: 0,
        hInstance: hinstance(),
        hIcon: std::ptr::null_mut(),
        hCursor: std::ptr::null_mut(),
        hbrBackground: std::ptr::null_mut(),
        lpszMenuName: std::ptr::null(),
        lpszClassName: WINDOW_CLASS_NAME,
        hIconSm: std::ptr::null_mut(),
    };
    let atom = RegisterClassExW(&class as *const _);
    if atom == 0 {
        return Err(io::Error::last_os_error());
    }

    let wide_name = to_wide(&name);
    let hwnd = match create_window(wide_name.as_ptr(), tx as isize) {
        Ok(hwnd) => hwnd,
        Err(err) => {
            UnregisterClassW(WINDOW_CLASS_NAME, hinstance());
            return Err(err);
        }
    };

    let mut registrations: Vec<HANDLE> = Vec::with_capacity(1);
    let mut iface: DEV_BROADCAST_DEVICEINTERFACE_W = std::mem::zeroed();
    iface.dbcc_size = std::mem::size_of::<DEV_BROADCAST_DEVICEINTERFACE_W>() as u32;
    iface.dbcc_devicetype = DBT_DEVTYP_DEVICEINTERFACE;
    iface.dbcc_classguid = USB_DEVICE_INTERFACE_CLASS;
    let flags = DEVICE_NOTIFY_WINDOW_HANDLE | DEVICE_NOTIFY_ALL_INTERFACE_CLASSES;
    let handle = RegisterDeviceNotificationW(hwnd as _, &iface as *const _ as _, flags);
    if handle.is_null() {
        let err = io::Error::last_os_error();
        teardown(hwnd, &registrations);
        return Err(err);
    }
    registrations.push(handle);

    let mut msg: MSG = std::mem::zeroed();
    let result = loop {
        match GetMessageW(&mut msg as *mut _, std::ptr::null_mut(), 0, 0) {
            0 => break Ok(()),
            -1 => break Err(io::Error::last_os_error()),
            _ if msg.message == WM_CLOSE => break Ok(()),
            _ => {
                TranslateMessage(&msg as *const _);
                DispatchMessageW(&msg as *const _);
            }
        }
    };

    teardown(hwnd, &registrations);
    result
}

/// Release in strictly reverse order of acquisition.
unsafe fn teardown(hwnd: HWND, registrations: &[HANDLE]) {
    for handle in registrations.iter().rev() {
        UnregisterDeviceNotification(*handle);
    }
    DestroyWindow(hwnd);
    UnregisterClassW(WINDOW_CLASS_NAME, hinstance());
}

fn hinstance() -> HMODULE {
    unsafe { GetModuleHandleW(std::ptr::null()) }
}
