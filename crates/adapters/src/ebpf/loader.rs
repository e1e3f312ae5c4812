use std::fmt::Write as _;
use std::path::Path;

use aya::Ebpf;
use aya::programs::Xdp;
use aya::programs::links::FdLink;
use aya::programs::xdp::{XdpFlags, XdpLinkId};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Name of the XDP decision program inside the offload object.
const XDP_PROGRAM: &str = "xdp_session_firewall";

/// Pin file name for the XDP attachment link.
const LINK_PIN: &str = "xdp_link";

/// The opaque offload object: loaded from disk, attached to the tunnel
/// interface, pinned/unpinned on request.
///
/// The object's internals are not this crate's business; it consumes the
/// device and inactivity maps whose layouts `ebpf-common` defines.
pub struct EbpfHandle {
    ebpf: Ebpf,
    digest: String,
    xdp_link_id: Option<XdpLinkId>,
}

impl EbpfHandle {
    /// Load the object file and record its SHA-256 for `/version/bpf`.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let bytes = std::fs::read(path)?;
        let ebpf = Ebpf::load(&bytes)?;

        let mut digest = String::with_capacity(64);
        for byte in Sha256::digest(&bytes) {
            let _ = write!(digest, "{byte:02x}");
        }

        info!(path = %path.display(), digest, "eBPF object loaded");
        Ok(Self {
            ebpf,
            digest,
            xdp_link_id: None,
        })
    }

    /// Hex SHA-256 of the loaded object bytes.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Attach the decision program to the tunnel interface.
    pub fn attach_xdp(&mut self, interface: &str) -> Result<(), anyhow::Error> {
        let program: &mut Xdp = self
            .ebpf
            .program_mut(XDP_PROGRAM)
            .ok_or_else(|| anyhow::anyhow!("program '{XDP_PROGRAM}' not found in eBPF object"))?
            .try_into()?;

        program.load()?;
        let link_id = program.attach(interface, XdpFlags::default())?;
        self.xdp_link_id = Some(link_id);
        info!(interface, "XDP program attached");
        Ok(())
    }

    /// Pin the attachment link and all maps under `dir` so they survive an
    /// agent restart.
    pub fn pin(&mut self, dir: &Path) -> Result<(), anyhow::Error> {
        std::fs::create_dir_all(dir)?;

        if let Some(link_id) = self.xdp_link_id.take() {
            let program: &mut Xdp = self
                .ebpf
                .program_mut(XDP_PROGRAM)
                .ok_or_else(|| anyhow::anyhow!("program '{XDP_PROGRAM}' not found"))?
                .try_into()?;
            let link = program.take_link(link_id)?;
            let fd_link: FdLink = link.try_into()?;
            fd_link.pin(dir.join(LINK_PIN))?;
        }

        let mut pinned = 0usize;
        for (name, map) in self.ebpf.maps_mut() {
            if let Err(e) = map.pin(dir.join(name)) {
                warn!(map = name, error = %e, "map pin failed");
            } else {
                pinned += 1;
            }
        }

        info!(dir = %dir.display(), pinned, "eBPF objects pinned");
        Ok(())
    }

    /// Remove every pin this handle may have created under `dir`.
    pub fn unpin(&mut self, dir: &Path) -> Result<(), anyhow::Error> {
        let mut removed = 0usize;
        let names: Vec<String> = self
            .ebpf
            .maps()
            .map(|(name, _)| name.to_string())
            .chain(std::iter::once(LINK_PIN.to_string()))
            .collect();

        for name in names {
            let path = dir.join(&name);
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(dir = %dir.display(), removed, "eBPF pins removed");
        Ok(())
    }

    /// Borrow the inner `Ebpf` so map managers can take their maps.
    pub fn ebpf_mut(&mut self) -> &mut Ebpf {
        &mut self.ebpf
    }
}
