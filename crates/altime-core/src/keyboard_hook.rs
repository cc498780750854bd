use crate::error::{Error, Result};
use crate::ime::Keyboard;
use crate::source::{KeyEventSource, Subscription};
use crate::types::{KeyDirection, RawKeyEvent};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use std::thread;
use tracing::{debug, error, info, warn};
use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP,
    VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG,
    PM_NOREMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

/// Magic number to identify our own injected events.
const INJECTED_EXTRA_INFO: usize = 0xFFC3C3C3;

/// Unassigned virtual key used to break up a bare Alt press.
const VK_DUMMY: VIRTUAL_KEY = VIRTUAL_KEY(0xFF);

lazy_static::lazy_static! {
    static ref HOOK_HANDLE: Mutex<Option<HHOOK>> = Mutex::new(None);
    static ref HOOK_SINK: Mutex<Option<Sender<RawKeyEvent>>> = Mutex::new(None);
}

/// `WH_KEYBOARD_LL` hook running on its own message-pumping thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct LowLevelHook;

impl KeyEventSource for LowLevelHook {
    fn install(&self, sink: Sender<RawKeyEvent>) -> Result<Subscription> {
        let (ready_tx, ready_rx) = bounded::<Result<u32>>(1);

        let thread = thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || hook_thread(sink, ready_tx))
            .map_err(|e| Error::HookInstall(e.to_string()))?;

        let thread_id = match ready_rx.recv() {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(Error::HookInstall(
                    "hook thread exited before installing".to_string(),
                ));
            }
        };

        Ok(Subscription::new(move || {
            unsafe {
                if let Err(e) = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) {
                    warn!("Failed to post WM_QUIT to hook thread: {}", e);
                }
            }
            if thread.join().is_err() {
                error!("Hook thread panicked");
            }
        }))
    }
}

fn hook_thread(sink: Sender<RawKeyEvent>, ready: Sender<Result<u32>>) {
    info!("Hook thread started");

    let mut msg = MSG::default();
    let thread_id = unsafe {
        // Force message queue creation so WM_QUIT can be posted at any time.
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
        GetCurrentThreadId()
    };

    let _installed = match install_hook(sink) {
        Ok(h) => h,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(thread_id));

    run_event_loop();
}

/// Hook ownership on the hook thread. Unhooks and releases the sink on drop,
/// including during unwinding.
struct InstalledHook(HHOOK);

impl Drop for InstalledHook {
    fn drop(&mut self) {
        unsafe {
            let _ = UnhookWindowsHookEx(self.0);
        }
        *HOOK_HANDLE.lock() = None;
        *HOOK_SINK.lock() = None;
        info!("Keyboard hook uninstalled.");
    }
}

fn install_hook(sink: Sender<RawKeyEvent>) -> Result<InstalledHook> {
    info!("Installing keyboard hook...");

    let mut handle = HOOK_HANDLE.lock();
    if handle.is_some() {
        return Err(Error::HookInstall("a keyboard hook is already installed".to_string()));
    }

    *HOOK_SINK.lock() = Some(sink);

    // Low-level hooks require hMod to be NULL if threadId is 0.
    let hook_id = match unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(hook_proc), HINSTANCE::default(), 0)
    } {
        Ok(h) if !h.is_invalid() => h,
        Ok(_) => {
            *HOOK_SINK.lock() = None;
            return Err(Error::HookInstall("SetWindowsHookExW returned NULL".to_string()));
        }
        Err(e) => {
            *HOOK_SINK.lock() = None;
            return Err(Error::HookInstall(e.to_string()));
        }
    };

    *handle = Some(hook_id);
    info!("Keyboard hook installed successfully. Handle: {:?}", hook_id);
    Ok(InstalledHook(hook_id))
}

/// Runs a blocking message loop until WM_QUIT.
fn run_event_loop() {
    info!("Starting message loop...");
    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    info!("Message loop exited.");
}

unsafe extern "system" fn hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code < 0 {
        return CallNextHookEx(None, code, wparam, lparam);
    }

    let kbd = &*(lparam.0 as *const KBDLLHOOKSTRUCT);

    if kbd.dwExtraInfo != INJECTED_EXTRA_INFO {
        let direction = match wparam.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyDirection::Pressed),
            WM_KEYUP | WM_SYSKEYUP => Some(KeyDirection::Released),
            _ => None,
        };

        if let Some(direction) = direction {
            if let Some(sink) = HOOK_SINK.lock().as_ref() {
                // Unbounded: never blocks the hook.
                let _ = sink.send(RawKeyEvent::new(kbd.vkCode, direction));
            }
        }
    }

    // Observer only: always pass the event on.
    CallNextHookEx(None, code, wparam, lparam)
}

/// `SendInput`-backed keyboard. Injected events carry [`INJECTED_EXTRA_INFO`]
/// so the hook does not report them back.
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputKeyboard;

impl Keyboard for SendInputKeyboard {
    fn send_dummy_key(&self) -> Result<()> {
        let key = |flags| INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VK_DUMMY,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: INJECTED_EXTRA_INFO,
                },
            },
        };
        let inputs = [
            key(KEYEVENTF_EXTENDEDKEY),
            key(KEYEVENTF_EXTENDEDKEY | KEYEVENTF_KEYUP),
        ];

        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(Error::Inject(format!(
                "SendInput accepted {} of {} events",
                sent,
                inputs.len()
            )));
        }
        debug!("Dummy key injected");
        Ok(())
    }
}
