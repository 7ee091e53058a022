use crate::config::HookConfig;
use crate::errors::FlowPatchError;
use log::{debug, error, info};
use std::process::Command;

/// Owns one `inet` table whose output chain queues the target port's
/// responses to userspace.
pub struct NftManager {
    table: String,
    chain_output: String,
    queue_num: u16,
    target_port: u16,
}

impl NftManager {
    pub fn new(hook: &HookConfig) -> Self {
        Self {
            table: hook.table.clone(),
            chain_output: "output".to_string(),
            queue_num: hook.queue_num,
            target_port: hook.target_port,
        }
    }

    fn run_cmd(cmd: &str) -> Result<(), FlowPatchError> {
        debug!("nft: {}", cmd);
        match Command::new("sh").arg("-c").arg(cmd).status() {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => {
                let code = s.code().unwrap_or(-1);
                let msg = format!("`{}` failed (exit {})", cmd, code);
                error!("{}", msg);
                Err(FlowPatchError::NftablesCmd(msg))
            }
            Err(e) => {
                let msg = format!("`{}` failed: {}", cmd, e);
                error!("{}", msg);
                Err(FlowPatchError::NftablesCmd(msg))
            }
        }
    }

    fn create_table_cmd(&self) -> String {
        format!(
            "nft list table inet {table} 2>/dev/null || \
             nft add table inet {table}",
            table = self.table
        )
    }

    fn create_chain_cmd(&self) -> String {
        format!(
            "nft list chain inet {table} {chain} 2>/dev/null || \
             nft add chain inet {table} {chain} \
                {{ type filter hook output priority 0 \\; policy accept \\; }}",
            table = self.table,
            chain = self.chain_output,
        )
    }

    fn flush_chain_cmd(&self) -> String {
        format!(
            "nft flush chain inet {table} {chain}",
            table = self.table,
            chain = self.chain_output
        )
    }

    // `bypass` keeps traffic flowing if the daemon is not attached
    fn queue_rule_cmd(&self) -> String {
        format!(
            "nft add rule inet {table} {chain} tcp sport {port} queue num {qnum} bypass",
            table = self.table,
            chain = self.chain_output,
            port = self.target_port,
            qnum = self.queue_num
        )
    }

    fn teardown_cmd(&self) -> String {
        format!("nft delete table inet {} 2>/dev/null", self.table)
    }

    /// Ensure the base table exists (creates it if it doesn't).
    pub fn create_table(&self) -> Result<(), FlowPatchError> {
        Self::run_cmd(&self.create_table_cmd())
    }

    pub fn create_chain(&self) -> Result<(), FlowPatchError> {
        Self::run_cmd(&self.create_chain_cmd())
    }

    pub fn flush_chain(&self) -> Result<(), FlowPatchError> {
        Self::run_cmd(&self.flush_chain_cmd())
    }

    pub fn add_queue_rule(&self) -> Result<(), FlowPatchError> {
        Self::run_cmd(&self.queue_rule_cmd())
    }

    pub fn setup(&self) -> Result<(), FlowPatchError> {
        self.create_table()?;
        self.create_chain()?;
        self.flush_chain()?;
        self.add_queue_rule()?;
        info!(
            "Queueing tcp sport {} to NFQUEUE #{} via table inet {}",
            self.target_port, self.queue_num, self.table
        );
        Ok(())
    }

    pub fn teardown(&self) -> Result<(), FlowPatchError> {
        Self::run_cmd(&self.teardown_cmd())?;
        info!("Removed table inet {}", self.table);
        Ok(())
    }
}
