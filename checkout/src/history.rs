use futures::future::join_all;
use payflow_common::activity::{merge_wallet_history, sort_newest_first, ActivityFilter, TxInfo};
use payflow_common::flow::FlowWallet;
use payflow_common::services::ActivitySource;

/// Activity across `wallets`, newest first.
///
/// Wallets are queried concurrently. A wallet whose history cannot be fetched
/// is logged and skipped; the others still show.
pub async fn fetch_activity<A: ActivitySource>(
    source: &A,
    wallets: &[FlowWallet],
    filter: &ActivityFilter,
) -> Vec<TxInfo> {
    let results = join_all(wallets.iter().map(|w| source.fetch_wallet_history(w))).await;

    let mut txs: Vec<TxInfo> = wallets
        .iter()
        .zip(results)
        .flat_map(|(wallet, result)| match result {
            Ok(history) => merge_wallet_history(wallet, history, filter),
            Err(err) => {
                tracing::warn!(
                    wallet = %wallet.address,
                    network = %wallet.network,
                    "activity fetch failed: {err}"
                );
                Vec::new()
            }
        })
        .collect();
    sort_newest_first(&mut txs);
    txs
}
