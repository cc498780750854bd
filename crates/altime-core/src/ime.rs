use crate::error::{ImeError, Result};

/// Sets the IME open status of whatever window currently has focus.
pub trait ImeController: Send + Sync + 'static {
    fn set_enabled(&self, enabled: bool) -> std::result::Result<(), ImeError>;
}

/// Injects the no-op key used to keep a released Alt from focusing the menu bar.
pub trait Keyboard: Send + Sync + 'static {
    fn send_dummy_key(&self) -> Result<()>;
}

/// Keyboard that injects nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKeyboard;

impl Keyboard for NoopKeyboard {
    fn send_dummy_key(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(windows)]
pub use self::windows_ime::WindowsIme;

#[cfg(windows)]
mod windows_ime {
    use super::ImeController;
    use crate::error::ImeError;
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::UI::Input::Ime::ImmGetDefaultIMEWnd;
    use windows::Win32::UI::WindowsAndMessaging::{
        GetGUIThreadInfo, SendMessageW, GUITHREADINFO, WM_IME_CONTROL,
    };

    const IMC_SETOPENSTATUS: usize = 0x0006;

    #[derive(Debug, Default, Clone, Copy)]
    pub struct WindowsIme;

    impl ImeController for WindowsIme {
        fn set_enabled(&self, enabled: bool) -> Result<(), ImeError> {
            let mut gui_thread_info = GUITHREADINFO {
                cbSize: std::mem::size_of::<GUITHREADINFO>() as u32,
                ..Default::default()
            };

            // Thread 0 = the foreground thread.
            unsafe { GetGUIThreadInfo(0, &mut gui_thread_info) }
                .map_err(|e| ImeError::FocusLookup(e.to_string()))?;

            let hwnd_ime = unsafe { ImmGetDefaultIMEWnd(gui_thread_info.hwndFocus) };
            if hwnd_ime.0 == 0 {
                return Err(ImeError::NoImeWindow);
            }

            let lresult = unsafe {
                SendMessageW(
                    hwnd_ime,
                    WM_IME_CONTROL,
                    WPARAM(IMC_SETOPENSTATUS),
                    LPARAM(enabled as isize),
                )
            };
            if lresult.0 != 0 {
                return Err(ImeError::Rejected(lresult.0));
            }

            Ok(())
        }
    }
}
