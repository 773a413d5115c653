//! Typed facade over the node's JSON-RPC methods.
//!
//! # Architecture
//!
//! ```text
//! caller ──► PhantasmaApi::get_*() ──► Transport::send() ──► decode ──► Result<T, ApiError>
//! ```
//!
//! Each operation maps to exactly one remote method. The transport and the
//! decoder are the only failure sources, and both collapse into an
//! [`ApiError`] carrying an [`ErrorKind`] and a message. Nothing here
//! panics on bad input from the node.
//!
//! # Pagination
//!
//! Paginated methods return [`Paginated`] with the page counters read from
//! the outer node. [`collect_pages`] walks the remaining pages.
//!
//! # Usage
//!
//! ```ignore
//! let api = PhantasmaApi::new(HttpTransport::new("http://localhost:7077/rpc")?);
//! let account = api.get_account("P2f7ZFuj6NfZ76ymNMnG3xRBT5hAMicDrQRHE4S7SoxEr").await?;
//! for balance in &account.balances {
//!     println!("{} {}", balance.amount, balance.symbol);
//! }
//! ```

use std::future::Future;

use serde_json::{json, Value};
use thiserror::Error;

use crate::decode::{decode, decode_count, decode_list, decode_page, decode_text, DecodeError};
use crate::error::ErrorKind;
use crate::models::{
    Account, AccountTransactions, App, Auction, Balance, Block, Chain, Paginated, Script, Token,
    TokenData, Transaction,
};
use crate::rpc::{RpcError, Transport};

/// Page numbers start at 1.
pub const FIRST_PAGE: u32 = 1;

/// Error returned by every facade operation.
///
/// Displays as `"{KIND} - {message}"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} - {message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        ApiError::new(err.kind(), err.to_string())
    }
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        ApiError::new(ErrorKind::MalformedResponse, err.to_string())
    }
}

/// Client for the node's RPC methods.
#[derive(Debug, Clone)]
pub struct PhantasmaApi<T> {
    transport: T,
}

impl<T: Transport> PhantasmaApi<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and decode its `result` node with `decode_result`.
    async fn call<R, F>(
        &self,
        method: &'static str,
        params: Vec<Value>,
        decode_result: F,
    ) -> Result<R, ApiError>
    where
        F: FnOnce(&Value) -> Result<R, DecodeError>,
    {
        let node = self.transport.send(method, params).await?;

        match decode_result(&node) {
            Ok(record) => {
                tracing::debug!(method, "rpc result decoded");
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(method, error = %e, "rpc result did not decode");
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// getAccount - Account name and balances of an address.
    pub async fn get_account(&self, address: &str) -> Result<Account, ApiError> {
        self.call("getAccount", vec![json!(address)], decode::<Account>)
            .await
    }

    /// lookUpName - Address that owns a registered name.
    pub async fn look_up_name(&self, name: &str) -> Result<String, ApiError> {
        self.call("lookUpName", vec![json!(name)], decode_text).await
    }

    /// getAddressTransactions - One page of an address's transactions.
    pub async fn get_address_transactions(
        &self,
        address: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Paginated<AccountTransactions>, ApiError> {
        self.call(
            "getAddressTransactions",
            vec![json!(address), json!(page), json!(page_size)],
            |node| decode_page(node, decode::<AccountTransactions>),
        )
        .await
    }

    /// getAddressTransactionCount - Number of transactions of an address on a chain.
    pub async fn get_address_transaction_count(
        &self,
        address: &str,
        chain: &str,
    ) -> Result<u64, ApiError> {
        self.call(
            "getAddressTransactionCount",
            vec![json!(address), json!(chain)],
            decode_count,
        )
        .await
    }

    /// Every transaction of `address`, walking all pages.
    pub async fn get_all_address_transactions(
        &self,
        address: &str,
        page_size: u32,
    ) -> Result<Vec<Transaction>, ApiError> {
        collect_pages(move |page| async move {
            let page = self
                .get_address_transactions(address, page, page_size)
                .await?;
            Ok(Paginated {
                page: page.page,
                total_pages: page.total_pages,
                result: page.result.txs,
            })
        })
        .await
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// getBlockHeight - Current height of a chain.
    pub async fn get_block_height(&self, chain: &str) -> Result<u64, ApiError> {
        self.call("getBlockHeight", vec![json!(chain)], decode_count)
            .await
    }

    /// getBlockTransactionCountByHash - Number of transactions in a block.
    pub async fn get_block_transaction_count_by_hash(
        &self,
        block_hash: &str,
    ) -> Result<u64, ApiError> {
        self.call(
            "getBlockTransactionCountByHash",
            vec![json!(block_hash)],
            decode_count,
        )
        .await
    }

    /// getBlockByHash - Block with the given hash.
    pub async fn get_block_by_hash(&self, block_hash: &str) -> Result<Block, ApiError> {
        self.call("getBlockByHash", vec![json!(block_hash)], decode::<Block>)
            .await
    }

    /// getRawBlockByHash - Serialized block, hex encoded.
    pub async fn get_raw_block_by_hash(&self, block_hash: &str) -> Result<String, ApiError> {
        self.call("getRawBlockByHash", vec![json!(block_hash)], decode_text)
            .await
    }

    /// getBlockByHeight - Block at `height` on `chain`.
    pub async fn get_block_by_height(&self, chain: &str, height: u64) -> Result<Block, ApiError> {
        self.call(
            "getBlockByHeight",
            vec![json!(chain), json!(height)],
            decode::<Block>,
        )
        .await
    }

    /// getRawBlockByHeight - Serialized block at `height`, hex encoded.
    pub async fn get_raw_block_by_height(
        &self,
        chain: &str,
        height: u64,
    ) -> Result<String, ApiError> {
        self.call(
            "getRawBlockByHeight",
            vec![json!(chain), json!(height)],
            decode_text,
        )
        .await
    }

    /// getTransactionByBlockHashAndIndex - Transaction at `index` in a block.
    pub async fn get_transaction_by_block_hash_and_index(
        &self,
        block_hash: &str,
        index: u32,
    ) -> Result<Transaction, ApiError> {
        self.call(
            "getTransactionByBlockHashAndIndex",
            vec![json!(block_hash), json!(index)],
            decode::<Transaction>,
        )
        .await
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// sendRawTransaction - Broadcast a signed transaction; returns its hash.
    pub async fn send_raw_transaction(&self, tx_hex: &str) -> Result<String, ApiError> {
        self.call("sendRawTransaction", vec![json!(tx_hex)], decode_text)
            .await
    }

    /// invokeRawScript - Run a script against current state without committing.
    pub async fn invoke_raw_script(
        &self,
        chain: &str,
        script_hex: &str,
    ) -> Result<Script, ApiError> {
        self.call(
            "invokeRawScript",
            vec![json!(chain), json!(script_hex)],
            decode::<Script>,
        )
        .await
    }

    /// getTransaction - Transaction by hash.
    pub async fn get_transaction(&self, hash: &str) -> Result<Transaction, ApiError> {
        self.call("getTransaction", vec![json!(hash)], decode::<Transaction>)
            .await
    }

    /// cancelTransaction - Drop a pending transaction from the mempool.
    pub async fn cancel_transaction(&self, hash: &str) -> Result<String, ApiError> {
        self.call("cancelTransaction", vec![json!(hash)], decode_text)
            .await
    }

    // =========================================================================
    // Chains, apps and tokens
    // =========================================================================

    /// getChains - Every chain on the nexus.
    pub async fn get_chains(&self) -> Result<Vec<Chain>, ApiError> {
        self.call("getChains", Vec::new(), decode_list::<Chain>).await
    }

    /// getApps - Every registered app.
    pub async fn get_apps(&self) -> Result<Vec<App>, ApiError> {
        self.call("getApps", Vec::new(), decode_list::<App>).await
    }

    /// getTokens - Every deployed token.
    pub async fn get_tokens(&self) -> Result<Vec<Token>, ApiError> {
        self.call("getTokens", Vec::new(), decode_list::<Token>).await
    }

    /// getToken - One token definition.
    pub async fn get_token(&self, symbol: &str) -> Result<Token, ApiError> {
        self.call("getToken", vec![json!(symbol)], decode::<Token>)
            .await
    }

    /// getTokenData - Attributes of one non-fungible token instance.
    pub async fn get_token_data(&self, symbol: &str, id: &str) -> Result<TokenData, ApiError> {
        self.call(
            "getTokenData",
            vec![json!(symbol), json!(id)],
            decode::<TokenData>,
        )
        .await
    }

    /// getTokenTransfers - One page of a token's transfer transactions.
    pub async fn get_token_transfers(
        &self,
        symbol: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Paginated<Vec<Transaction>>, ApiError> {
        self.call(
            "getTokenTransfers",
            vec![json!(symbol), json!(page), json!(page_size)],
            |node| decode_page(node, decode_list::<Transaction>),
        )
        .await
    }

    /// getTokenTransferCount - Number of transfers of a token.
    pub async fn get_token_transfer_count(&self, symbol: &str) -> Result<u64, ApiError> {
        self.call("getTokenTransferCount", vec![json!(symbol)], decode_count)
            .await
    }

    /// getTokenBalance - Balance of one token for an address on a chain.
    pub async fn get_token_balance(
        &self,
        address: &str,
        symbol: &str,
        chain: &str,
    ) -> Result<Balance, ApiError> {
        self.call(
            "getTokenBalance",
            vec![json!(address), json!(symbol), json!(chain)],
            decode::<Balance>,
        )
        .await
    }

    // =========================================================================
    // Market
    // =========================================================================

    /// getAuctionsCount - Number of active auctions for a token.
    pub async fn get_auctions_count(&self, chain: &str, symbol: &str) -> Result<u64, ApiError> {
        self.call(
            "getAuctionsCount",
            vec![json!(chain), json!(symbol)],
            decode_count,
        )
        .await
    }

    /// getAuctions - One page of active auctions.
    pub async fn get_auctions(
        &self,
        chain: &str,
        symbol: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Paginated<Vec<Auction>>, ApiError> {
        self.call(
            "getAuctions",
            vec![json!(chain), json!(symbol), json!(page), json!(page_size)],
            |node| decode_page(node, decode_list::<Auction>),
        )
        .await
    }

    /// getAuction - Auction of one token instance.
    pub async fn get_auction(&self, chain: &str, symbol: &str, id: &str) -> Result<Auction, ApiError> {
        self.call(
            "getAuction",
            vec![json!(chain), json!(symbol), json!(id)],
            decode::<Auction>,
        )
        .await
    }
}

/// Fetch every page of a paginated call and concatenate the results.
///
/// `fetch` is called with page numbers starting at [`FIRST_PAGE`]. The walk
/// stops after the page whose number reaches `totalPages`, on an empty page,
/// or immediately when `totalPages` is 0. The first error aborts the walk.
///
/// # Example
///
/// ```ignore
/// let auctions = collect_pages(|page| api.get_auctions("main", "CAR", page, 50)).await?;
/// ```
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Paginated<Vec<T>>, ApiError>>,
{
    let mut items = Vec::new();
    let mut page = FIRST_PAGE;

    loop {
        let batch = fetch(page).await?;
        let total_pages = batch.total_pages;
        let fetched = batch.result.len();
        items.extend(batch.result);

        tracing::debug!(page, total_pages, fetched, "page collected");

        if total_pages == 0 || fetched == 0 || page >= total_pages {
            break;
        }
        page += 1;
    }

    Ok(items)
}
