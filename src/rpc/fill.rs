//! Default filling

use super::provider::ChainDataProvider;
use crate::error::{TxError, TxResult};
use crate::transaction::Transaction;

const LOG_TARGET: &str = "klaytn_tx::rpc";

impl Transaction {
    /// Look up `gasPrice`, `nonce` and `chainId` for whichever of them are
    /// unset. Set fields are never queried or overwritten, and nothing is
    /// written unless every lookup succeeds.
    pub async fn fill_transaction<P: ChainDataProvider>(&mut self, provider: &P) -> TxResult<()> {
        let gas_price = match self.gas_price {
            Some(gas_price) => gas_price,
            None => {
                crate::log_debug!(LOG_TARGET, "looking up gas price", tx_type = self.tx_type);
                provider.get_gas_price().await?
            }
        };

        let nonce = match self.nonce {
            Some(nonce) => nonce,
            None => {
                let from = self.from.ok_or_else(|| {
                    TxError::validation("\"from\" is missing: the nonce lookup needs a sender address.")
                })?;
                crate::log_debug!(
                    LOG_TARGET,
                    "looking up nonce",
                    tx_type = self.tx_type,
                    from = crate::utils::encoding::format_address(&from),
                );
                provider.get_transaction_count(&from).await?
            }
        };

        let chain_id = match self.chain_id {
            Some(chain_id) => chain_id,
            None => {
                crate::log_debug!(LOG_TARGET, "looking up chain id", tx_type = self.tx_type);
                provider.get_chain_id().await?
            }
        };

        self.gas_price = Some(gas_price);
        self.nonce = Some(nonce);
        self.chain_id = Some(chain_id);
        Ok(())
    }
}
