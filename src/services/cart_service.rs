use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::CartConfig;
use crate::models::{
    validate_import_item, validate_quantity, BackupInfo, CartAnalytics, CartError, CartEvent,
    CartExport, CartItem, CartResult, CartSummary, Discount, ExportMetadata, MinimalCartItem,
    Product, ShippingMethod, Validate, EXPORT_VERSION,
};
use crate::stores::KeyValueStore;

/// Optional behavior for a single add-to-cart call
#[derive(Debug, Clone, Copy, Default)]
pub struct AddToCartOptions {
    /// Clamp the resulting quantity to the available stock, with a warning,
    /// instead of exceeding it
    pub max_stock: Option<u32>,
}

/// Handle for a registered cart listener, used to unregister it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&CartEvent) + Send + Sync>;

/// The cart state engine: single authoritative in-memory representation of
/// the cart, with durable persistence and change notification.
///
/// In-memory state and listener notifications are updated synchronously on
/// every mutation; the durable write is debounced so rapid successive
/// mutations coalesce into a single save. `clear_cart` persists
/// immediately. A background watcher observes external writes to the cart
/// key (another instance sharing the store) and reloads state from them.
///
/// Lifecycle is construct, use, [`CartService::destroy`]; the instance must
/// not be reused after `destroy`.
pub struct CartService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    instance_id: Uuid,
    config: CartConfig,
    store: Arc<dyn KeyValueStore>,
    items: RwLock<Vec<CartItem>>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_listener_id: AtomicU64,
    pending_save: Mutex<Option<JoinHandle<()>>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl CartService {
    /// Create a new CartService backed by the given store, loading any
    /// previously persisted cart. Corrupt or missing persisted state yields
    /// an empty cart, never a construction failure.
    pub async fn new(store: Arc<dyn KeyValueStore>, config: CartConfig) -> Self {
        let inner = Arc::new(ServiceInner {
            instance_id: Uuid::new_v4(),
            config,
            store: Arc::clone(&store),
            items: RwLock::new(Vec::new()),
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
            pending_save: Mutex::new(None),
            watcher: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        });

        inner.load_persisted_cart().await;

        let watcher = Self::spawn_watcher(&inner);
        *inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(watcher);

        info!(instance_id = %inner.instance_id, "cart service initialized");
        Self { inner }
    }

    /// Watch the store for writes to the cart key made by other instances
    fn spawn_watcher(inner: &Arc<ServiceInner>) -> JoinHandle<()> {
        let mut rx = inner.store.subscribe();
        let weak = Arc::downgrade(inner);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let Some(inner) = weak.upgrade() else { break };
                        if inner.destroyed.load(Ordering::SeqCst) {
                            break;
                        }
                        if event.origin == inner.instance_id
                            || event.key != inner.config.storage.cart_key
                        {
                            continue;
                        }
                        debug!(key = %event.key, "external cart change detected, reloading");
                        inner.reload_from_store().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "store event stream lagged, continuing");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    // Mutation operations

    /// Add a product to the cart, merging with any existing line for the
    /// same product id
    #[instrument(skip(self, product, options), fields(product_id = %product.id))]
    pub fn add_to_cart(
        &self,
        product: &Product,
        quantity: u32,
        options: AddToCartOptions,
    ) -> CartResult<()> {
        if product.id.trim().is_empty() {
            return Err(CartError::MissingProductId);
        }
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }
        validate_quantity(quantity)?;
        product.validate()?;

        let max_stock = options.max_stock.filter(|max| *max >= 1);

        {
            let mut items = self.inner.items_mut();
            if let Some(item) = items.iter_mut().find(|item| item.id == product.id) {
                let mut new_quantity = item.quantity.saturating_add(quantity);
                if let Some(max) = max_stock {
                    if new_quantity > max {
                        warn!(
                            requested = new_quantity,
                            max_stock = max,
                            "quantity clamped to stock limit"
                        );
                        new_quantity = max;
                    }
                }
                item.quantity = new_quantity;
                item.touch();
            } else {
                let mut initial = quantity;
                if let Some(max) = max_stock {
                    if initial > max {
                        warn!(
                            requested = initial,
                            max_stock = max,
                            "quantity clamped to stock limit"
                        );
                        initial = max;
                    }
                }
                items.push(CartItem::from_product(product, initial));
            }
        }

        info!("item added to cart");
        self.inner.after_mutation();
        Ok(())
    }

    /// Remove an item from the cart entirely
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove_from_cart(&self, product_id: &str) -> CartResult<()> {
        let removed = {
            let mut items = self.inner.items_mut();
            let before = items.len();
            items.retain(|item| item.id != product_id);
            items.len() != before
        };

        if !removed {
            return Err(CartError::ItemNotFound {
                product_id: product_id.to_string(),
            });
        }

        info!("item removed from cart");
        self.inner.after_mutation();
        Ok(())
    }

    /// Set the quantity of an item; a quantity of zero removes it entirely
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn update_quantity(&self, product_id: &str, quantity: u32) -> CartResult<()> {
        if quantity == 0 {
            return self.remove_from_cart(product_id);
        }
        validate_quantity(quantity)?;

        {
            let mut items = self.inner.items_mut();
            let item = items
                .iter_mut()
                .find(|item| item.id == product_id)
                .ok_or_else(|| CartError::ItemNotFound {
                    product_id: product_id.to_string(),
                })?;
            item.quantity = quantity;
            item.touch();
        }

        info!("cart item quantity updated");
        self.inner.after_mutation();
        Ok(())
    }

    /// Empty the cart unconditionally. Idempotent, and persisted
    /// immediately rather than debounced.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) {
        self.inner.items_mut().clear();
        info!("cart cleared");
        self.inner.notify();
        self.flush().await;
    }

    /// Cancel any pending debounced save and persist the cart now.
    /// Persistence failures degrade internally and are never surfaced.
    pub async fn flush(&self) {
        ServiceInner::cancel_pending_save(&self.inner);
        self.inner.persist().await;
    }

    // Query operations (side-effect-free, defensive copies)

    /// Ordered snapshot of the cart contents
    pub fn get_cart(&self) -> Vec<CartItem> {
        self.inner.items().clone()
    }

    pub fn get_cart_item(&self, product_id: &str) -> Option<CartItem> {
        self.inner
            .items()
            .iter()
            .find(|item| item.id == product_id)
            .cloned()
    }

    pub fn has_item(&self, product_id: &str) -> bool {
        self.inner.items().iter().any(|item| item.id == product_id)
    }

    pub fn get_item_quantity(&self, product_id: &str) -> u32 {
        self.inner
            .items()
            .iter()
            .find(|item| item.id == product_id)
            .map(|item| item.quantity)
            .unwrap_or(0)
    }

    pub fn get_items_by_category(&self, category: &str) -> Vec<CartItem> {
        self.inner
            .items()
            .iter()
            .filter(|item| item.category.as_deref() == Some(category))
            .cloned()
            .collect()
    }

    /// Total number of units across all items (not distinct products)
    pub fn get_cart_item_count(&self) -> u32 {
        crate::models::item_count(&self.inner.items())
    }

    pub fn is_cart_empty(&self) -> bool {
        self.inner.items().is_empty()
    }

    /// Sum of unit price times quantity, before shipping and tax
    pub fn get_cart_subtotal(&self) -> Decimal {
        crate::models::subtotal(&self.inner.items())
    }

    /// Currently equivalent to the subtotal (pre-tax, pre-shipping)
    pub fn get_cart_total(&self) -> Decimal {
        self.get_cart_subtotal()
    }

    pub fn get_cart_summary(&self) -> CartSummary {
        CartSummary::compute(&self.inner.items(), &self.inner.config.pricing)
    }

    pub fn get_analytics(&self) -> CartAnalytics {
        CartAnalytics::compute(&self.inner.items(), Utc::now())
    }

    /// Shipping cost for the current subtotal under the given method
    pub fn get_shipping_cost(&self, method: ShippingMethod) -> Decimal {
        let subtotal = self.get_cart_subtotal();
        self.inner.config.pricing.shipping_cost(subtotal, method)
    }

    /// Look up a discount code (case-insensitive) and return its
    /// descriptor. The descriptor is not folded into the summary; the
    /// caller combines the two.
    #[instrument(skip(self))]
    pub fn apply_discount(&self, code: &str) -> CartResult<Discount> {
        let normalized = code.trim().to_uppercase();
        match self.inner.config.discounts.get(&normalized) {
            Some(discount) => {
                info!(code = %normalized, "discount code accepted");
                Ok(discount.clone())
            }
            None => Err(CartError::InvalidDiscountCode {
                code: code.to_string(),
            }),
        }
    }

    // Change notification

    /// Register a listener invoked synchronously on every mutation. A
    /// panicking listener is isolated and logged; it does not prevent other
    /// listeners from running.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CartEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(listener));
        ListenerId(id)
    }

    /// Unregister a listener; returns whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.0)
            .is_some()
    }

    // Backup / restore / export

    /// Produce a versioned snapshot of the full cart state
    pub fn export_cart(&self) -> CartExport {
        let items = self.get_cart();
        let now = Utc::now();
        CartExport {
            version: EXPORT_VERSION,
            exported_at: now,
            summary: CartSummary::compute(&items, &self.inner.config.pricing),
            analytics: CartAnalytics::compute(&items, now),
            items,
            app: ExportMetadata::default(),
        }
    }

    /// Replace the cart with the items of an exported snapshot. Invalid
    /// items are dropped individually with a warning; only a missing or
    /// non-array `items` field rejects the payload wholesale. Returns the
    /// number of items accepted.
    #[instrument(skip(self, data))]
    pub fn import_cart(&self, data: serde_json::Value) -> CartResult<usize> {
        let raw_items = data
            .get("items")
            .and_then(|value| value.as_array())
            .ok_or_else(|| CartError::InvalidImport {
                message: "missing or non-array items".to_string(),
            })?;

        let mut accepted: Vec<CartItem> = Vec::new();
        for raw in raw_items {
            match serde_json::from_value::<CartItem>(raw.clone()) {
                Ok(mut item) if validate_import_item(&item).is_ok() => {
                    if accepted.iter().any(|existing| existing.id == item.id) {
                        warn!(product_id = %item.id, "duplicate item dropped during import");
                        continue;
                    }
                    item.normalize();
                    accepted.push(item);
                }
                _ => warn!("invalid item dropped during import"),
            }
        }

        let count = accepted.len();
        *self.inner.items_mut() = accepted;

        info!(count, "cart imported");
        self.inner.after_mutation();
        Ok(count)
    }

    /// Persist an export under a uniquely timestamped key; returns the
    /// backup id
    #[instrument(skip(self))]
    pub async fn create_backup(&self) -> CartResult<String> {
        let export = self.export_cart();
        let short = Uuid::new_v4().simple().to_string();
        let id = format!("{:013}-{}", Utc::now().timestamp_millis(), &short[..8]);
        let key = self.inner.config.storage.backup_key(&id);

        let payload = serde_json::to_string(&export)?;
        self.inner
            .store
            .put(&key, &payload, self.inner.instance_id)
            .await?;

        info!(backup_id = %id, items = export.items.len(), "backup created");
        Ok(id)
    }

    /// Restore the cart from a stored backup; returns the number of items
    /// accepted
    #[instrument(skip(self), fields(backup_id = %id))]
    pub async fn restore_backup(&self, id: &str) -> CartResult<usize> {
        let key = self.inner.config.storage.backup_key(id);
        let raw = self
            .inner
            .store
            .get(&key)
            .await?
            .ok_or_else(|| CartError::BackupNotFound { id: id.to_string() })?;

        let data: serde_json::Value = serde_json::from_str(&raw)?;
        let count = self.import_cart(data)?;
        info!(count, "backup restored");
        Ok(count)
    }

    /// Enumerate stored backups, newest first. Unreadable entries are
    /// skipped with a warning.
    pub async fn get_backups(&self) -> CartResult<Vec<BackupInfo>> {
        let prefix = &self.inner.config.storage.backup_prefix;
        let keys = self.inner.store.list_keys(prefix).await?;

        let mut backups = Vec::new();
        for key in keys {
            let Some(raw) = self.inner.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<CartExport>(&raw) {
                Ok(export) => backups.push(BackupInfo {
                    id: key.strip_prefix(prefix.as_str()).unwrap_or(&key).to_string(),
                    created_at: export.exported_at,
                    item_count: export.summary.item_count,
                    total: export.summary.total,
                }),
                Err(e) => warn!(key = %key, error = %e, "skipping unreadable backup"),
            }
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Delete all but the `keep_count` most recent backups; returns the
    /// number deleted
    #[instrument(skip(self))]
    pub async fn cleanup_backups(&self, keep_count: usize) -> CartResult<usize> {
        let backups = self.get_backups().await?;
        let mut removed = 0;

        for stale in backups.iter().skip(keep_count) {
            let key = self.inner.config.storage.backup_key(&stale.id);
            self.inner
                .store
                .delete(&key, self.inner.instance_id)
                .await?;
            removed += 1;
        }

        if removed > 0 {
            info!(removed, kept = keep_count.min(backups.len()), "backups cleaned up");
        }
        Ok(removed)
    }

    // Teardown

    /// Stop the store watcher, drop any pending save, and clear listeners
    /// and in-memory state. The instance must not be reused afterwards.
    pub fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::SeqCst);

        ServiceInner::cancel_pending_save(&self.inner);
        if let Some(watcher) = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            watcher.abort();
        }

        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner.items_mut().clear();

        info!(instance_id = %self.inner.instance_id, "cart service destroyed");
    }
}

impl ServiceInner {
    fn items(&self) -> std::sync::RwLockReadGuard<'_, Vec<CartItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn items_mut(&self) -> std::sync::RwLockWriteGuard<'_, Vec<CartItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempt to load a previously persisted cart. Malformed payloads are
    /// logged and treated as an empty cart.
    async fn load_persisted_cart(&self) {
        let key = &self.config.storage.cart_key;
        match self.store.get(key).await {
            Ok(Some(raw)) => match Self::parse_cart_payload(&raw) {
                Some(items) => {
                    info!(count = items.len(), "persisted cart loaded");
                    *self.items_mut() = items;
                }
                None => {
                    warn!(key = %key, "persisted cart is malformed, starting empty");
                }
            },
            Ok(None) => debug!("no persisted cart found"),
            Err(e) => warn!(error = %e, "failed to read persisted cart, starting empty"),
        }
    }

    /// Parse a persisted payload: the full item shape first, then the
    /// reduced `{id, quantity}` fallback shape written under storage
    /// pressure. Zero-quantity entries are dropped either way.
    fn parse_cart_payload(raw: &str) -> Option<Vec<CartItem>> {
        if let Ok(items) = serde_json::from_str::<Vec<CartItem>>(raw) {
            let items: Vec<CartItem> = items
                .into_iter()
                .filter(|item| item.quantity >= 1 && !item.id.is_empty())
                .map(|mut item| {
                    item.normalize();
                    item
                })
                .collect();
            return Some(items);
        }

        if let Ok(minimal) = serde_json::from_str::<Vec<MinimalCartItem>>(raw) {
            warn!("restoring cart from reduced fallback payload");
            let items = minimal
                .into_iter()
                .filter(|item| item.quantity >= 1 && !item.id.is_empty())
                .map(MinimalCartItem::into_placeholder_item)
                .collect();
            return Some(items);
        }

        None
    }

    /// Reload state after an external write to the cart key. A malformed
    /// external payload leaves the current in-memory state untouched.
    async fn reload_from_store(&self) {
        let key = &self.config.storage.cart_key;
        let items = match self.store.get(key).await {
            Ok(Some(raw)) => match Self::parse_cart_payload(&raw) {
                Some(items) => items,
                None => {
                    warn!(key = %key, "external cart payload is malformed, keeping current state");
                    return;
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to reload cart after external change");
                return;
            }
        };

        *self.items_mut() = items;
        info!("cart reloaded after external change");
        self.notify();
    }

    /// Synchronous follow-up to every successful mutation: notify
    /// listeners, then coalesce the durable write
    fn after_mutation(self: &Arc<Self>) {
        self.notify();
        self.schedule_save();
    }

    fn build_event(&self) -> CartEvent {
        let items = self.items().clone();
        let summary = CartSummary::compute(&items, &self.config.pricing);
        let subtotal = crate::models::subtotal(&items);
        CartEvent {
            item_count: summary.item_count,
            total: subtotal,
            subtotal,
            summary,
            cart: items,
            timestamp: Utc::now(),
        }
    }

    fn notify(&self) {
        let event = self.build_event();
        let listeners: Vec<(u64, Listener)> = {
            let guard = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            guard
                .iter()
                .map(|(id, listener)| (*id, Arc::clone(listener)))
                .collect()
        };

        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                warn!(listener_id = id, "cart listener panicked during notification");
            }
        }
    }

    /// Schedule a deferred save, cancelling any previously scheduled one.
    /// The last mutation within the debounce window determines what gets
    /// persisted.
    fn schedule_save(self: &Arc<Self>) {
        let mut pending = self
            .pending_save
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let inner = Arc::clone(self);
        let delay = self.config.persistence.debounce();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.persist().await;
        }));
    }

    fn cancel_pending_save(inner: &Arc<Self>) {
        if let Some(pending) = inner
            .pending_save
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pending.abort();
        }
    }

    /// Write the cart to the store, refreshing `updated_at` on every item
    /// at save time. A failed full save falls back to the reduced
    /// `{id, quantity}` shape; a failed fallback leaves the in-memory cart
    /// authoritative for the rest of the session.
    async fn persist(&self) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }

        let snapshot: Vec<CartItem> = {
            let mut items = self.items_mut();
            for item in items.iter_mut() {
                item.touch();
            }
            items.clone()
        };

        let key = &self.config.storage.cart_key;
        let payload = match serde_json::to_string(&snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "failed to serialize cart for persistence");
                return;
            }
        };

        match self.store.put(key, &payload, self.instance_id).await {
            Ok(()) => debug!(items = snapshot.len(), "cart persisted"),
            Err(e) => {
                warn!(error = %e, "full cart save failed, attempting reduced fallback");
                self.persist_fallback(&snapshot).await;
            }
        }
    }

    async fn persist_fallback(&self, snapshot: &[CartItem]) {
        let minimal: Vec<MinimalCartItem> =
            snapshot.iter().map(MinimalCartItem::from).collect();
        let key = &self.config.storage.cart_key;

        let payload = match serde_json::to_string(&minimal) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "failed to serialize reduced cart payload");
                return;
            }
        };

        match self.store.put(key, &payload, self.instance_id).await {
            Ok(()) => warn!(items = minimal.len(), "reduced cart payload persisted"),
            Err(e) => {
                error!(
                    error = %e,
                    "fallback cart save failed, cart is in-memory only for this session"
                );
            }
        }
    }
}
