#[allow(non_upper_case_globals)]
#[allow(non_camel_case_types)]
#[allow(non_snake_case)]
#[allow(dead_code)]
mod bindings {
    include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
}

use bindings::*;

use crate::engine::{Engine, Verdict};
use crate::errors::FlowPatchError;
use libc::{recv, AF_INET, NFQNL_COPY_PACKET, NF_ACCEPT};
use log::{error, info, trace};
use once_cell::sync::OnceCell;
use std::ffi::c_void;
use std::io;
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;
use std::sync::Arc;

// The C callback carries no Rust state, so the engine lives here
static ENGINE: OnceCell<Arc<Engine>> = OnceCell::new();

/// An open NFQUEUE session bound to one queue.
pub struct NfQueue {
    handle: *mut nfq_handle,
    q_handle: *mut nfq_q_handle,
    queue_num: u16,
}

impl NfQueue {
    /// Open, bind, and create `queue_num`, feeding every packet to `engine`.
    pub fn open_and_bind(queue_num: u16, engine: Arc<Engine>) -> Result<Self, FlowPatchError> {
        ENGINE
            .set(engine)
            .map_err(|_| FlowPatchError::InitFailed("engine already attached".into()))?;

        let handle = unsafe { nfq_open() };
        if handle.is_null() {
            return Err(FlowPatchError::InitFailed("nfq_open returned null".into()));
        }

        let bind_res = unsafe { nfq_bind_pf(handle, AF_INET as u16) };
        if bind_res < 0 {
            unsafe { nfq_close(handle) };
            return Err(FlowPatchError::Nfqueue(bind_res));
        }

        let q_handle = unsafe {
            nfq_create_queue(
                handle,
                queue_num,
                Some(Self::packet_callback),
                ptr::null_mut(),
            )
        };
        if q_handle.is_null() {
            unsafe { nfq_close(handle) };
            return Err(FlowPatchError::InitFailed(
                "nfq_create_queue returned null".into(),
            ));
        }

        let setmode_res = unsafe { nfq_set_mode(q_handle, NFQNL_COPY_PACKET as u8, 0xffff) };
        if setmode_res < 0 {
            unsafe {
                nfq_destroy_queue(q_handle);
                nfq_close(handle);
            }
            return Err(FlowPatchError::Nfqueue(setmode_res));
        }

        Ok(Self {
            handle,
            q_handle,
            queue_num,
        })
    }

    /// Blocking packet loop. Only returns on a socket error.
    pub fn run(&self) -> Result<(), FlowPatchError> {
        const BUF_SIZE: usize = 65_536;
        let mut buf = vec![0_u8; BUF_SIZE];

        info!("Listening for packets on NFQUEUE #{}", self.queue_num);

        let fd = unsafe { nfq_fd(self.handle) };
        if fd < 0 {
            return Err(FlowPatchError::Nfqueue(fd));
        }

        loop {
            let len = unsafe { recv(fd, buf.as_mut_ptr() as *mut c_void, BUF_SIZE, 0 as c_int) };

            if len < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(FlowPatchError::Io(err));
            } else if len == 0 {
                continue;
            }

            let handle_res = unsafe {
                nfq_handle_packet(self.handle, buf.as_mut_ptr() as *mut c_char, len as c_int)
            };
            if handle_res < 0 {
                let err = io::Error::last_os_error();
                error!("nfq_handle_packet failed: {}", err);
                return Err(FlowPatchError::Io(err));
            }
        }
    }

    unsafe fn extract_packet_id(data: *mut nfq_data) -> u32 {
        let ph = nfq_get_msg_packet_hdr(data);
        if ph.is_null() {
            0
        } else {
            u32::from_be((*ph).packet_id)
        }
    }

    /// Borrow the queued packet in place. The buffer belongs to the netlink
    /// message and lives until the verdict is set.
    unsafe fn payload_mut<'a>(data: *mut nfq_data) -> Option<&'a mut [u8]> {
        let mut payload_ptr: *mut u8 = ptr::null_mut();
        let len = nfq_get_payload(data, &mut payload_ptr);
        if len <= 0 || payload_ptr.is_null() {
            None
        } else {
            Some(slice::from_raw_parts_mut(payload_ptr, len as usize))
        }
    }

    unsafe extern "C" fn packet_callback(
        qh: *mut nfq_q_handle,
        _nfmsg: *mut nfgenmsg,
        nfdata: *mut nfq_data,
        _data: *mut c_void,
    ) -> c_int {
        let pkt_id = Self::extract_packet_id(nfdata);

        let (verdict, packet) = match (ENGINE.get(), Self::payload_mut(nfdata)) {
            (Some(engine), Some(packet)) => (engine.process(packet), Some(packet)),
            _ => (Verdict::Unmodified, None),
        };

        let v = match (verdict, packet) {
            (Verdict::Modified, Some(packet)) => {
                trace!("Accepting rewritten packet {} ({} bytes)", pkt_id, packet.len());
                nfq_set_verdict(
                    qh,
                    pkt_id,
                    NF_ACCEPT as u32,
                    packet.len() as u32,
                    packet.as_ptr(),
                )
            }
            _ => nfq_set_verdict(qh, pkt_id, NF_ACCEPT as u32, 0, ptr::null()),
        };
        if v < 0 {
            error!("nfq_set_verdict error: {}", io::Error::last_os_error());
        }
        v
    }
}

impl Drop for NfQueue {
    fn drop(&mut self) {
        unsafe {
            nfq_destroy_queue(self.q_handle);
            nfq_unbind_pf(self.handle, AF_INET as u16);
            nfq_close(self.handle);
        }
    }
}
