//! Link runtime integration.
//!
//! Bridges a synchronous game loop with the async session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::frontend::GameFrontend;
use crate::session::Session;
use crate::types::{Move, PeerId, SessionState};
use crate::wire_log::WireLog;

/// How long [`Link::shutdown`] waits for the farewell to leave.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Running link: a session plus the runtime that drives it.
pub struct Link {
    session: Session,
    rt: Runtime,
}

impl Link {
    /// Start from environment variables.
    ///
    /// Returns `Ok(None)` if `CHECKERS_LINK_DISABLED` is set. With a `peer` the
    /// link invites it, otherwise it waits to be invited.
    pub fn start_from_env(
        frontend: Arc<dyn GameFrontend>,
        peer: Option<&str>,
    ) -> Result<Option<Self>, LinkError> {
        if LinkConfig::is_disabled() {
            info!("networking disabled via CHECKERS_LINK_DISABLED");
            return Ok(None);
        }
        let config = LinkConfig::from_env();
        let link = match peer {
            Some(peer) => Self::invite(config, frontend, peer)?,
            None => Self::listen(config, frontend)?,
        };
        Ok(Some(link))
    }

    /// Wait for an opponent's invitation.
    pub fn listen(config: LinkConfig, frontend: Arc<dyn GameFrontend>) -> Result<Self, LinkError> {
        Self::start(config, frontend, None)
    }

    /// Invite the opponent at `peer`.
    pub fn invite(
        config: LinkConfig,
        frontend: Arc<dyn GameFrontend>,
        peer: &str,
    ) -> Result<Self, LinkError> {
        Self::start(config, frontend, Some(PeerId::from_raw(peer)))
    }

    fn start(
        config: LinkConfig,
        frontend: Arc<dyn GameFrontend>,
        peer: Option<PeerId>,
    ) -> Result<Self, LinkError> {
        let rt = Runtime::new().map_err(LinkError::Runtime)?;
        let transport = config.build_transport();
        debug!(?config, "starting link");

        let session = rt.block_on(async {
            let wire_log = config.log_path.clone().map(WireLog::spawn);
            match peer {
                Some(peer) => Session::invite(transport, frontend, wire_log, peer).await,
                None => Session::listen(transport, frontend, wire_log).await,
            }
        })?;

        Ok(Self { session, rt })
    }

    pub fn move_piece(&self, mv: Move) -> Result<(), LinkError> {
        self.session.move_piece(mv)
    }

    pub fn end_turn(&self) -> Result<(), LinkError> {
        self.session.end_turn()
    }

    pub fn quit(&self) {
        self.session.quit();
    }

    pub fn concede(&self) {
        self.session.concede();
    }

    pub fn pause(&self) -> Result<(), LinkError> {
        self.session.pause()
    }

    pub fn resume(&self) -> Result<SessionState, LinkError> {
        self.rt.block_on(self.session.resume())
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn peer(&self) -> Option<PeerId> {
        self.session.peer()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.session.local_addr()
    }

    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    /// Block until the session has finished.
    pub fn wait_finished(&self) {
        self.rt.block_on(self.session.wait_finished());
    }

    /// Leave the game if still playing and give the farewell a moment to go out.
    pub fn shutdown(self) {
        self.session.shutdown();
        let _ = self.rt.block_on(async {
            tokio::time::timeout(SHUTDOWN_GRACE, self.session.wait_finished()).await
        });
    }
}
