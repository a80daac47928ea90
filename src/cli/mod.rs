use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "drift")]
#[command(version, about = "Portfolio performance and rebalancing tracker")]
#[command(
    long_about = "Track portfolio performance (IRR, time-weighted returns, FIFO cost basis) and keep allocations on target with drift analysis and rebalancing suggestions."
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage rebalancing strategies
    Strategy {
        #[command(subcommand)]
        action: StrategyCommands,
    },

    /// Manage allocation targets within a strategy
    Target {
        #[command(subcommand)]
        action: TargetCommands,
    },

    /// Manage per-strategy symbol exclusions
    Exclude {
        #[command(subcommand)]
        action: ExcludeCommands,
    },

    /// Allocation analysis, drift summary, and rebalancing suggestions
    Allocation {
        #[command(subcommand)]
        action: AllocationCommands,
    },

    /// Portfolio performance metrics
    Performance {
        #[command(subcommand)]
        action: PerformanceCommands,
    },

    /// Per-holding performance and cost basis
    Holding {
        #[command(subcommand)]
        action: HoldingCommands,
    },

    /// Record investment activities (buys, sells, dividends, ...)
    Activity {
        #[command(subcommand)]
        action: ActivityCommands,
    },

    /// Record daily portfolio valuations
    Valuation {
        #[command(subcommand)]
        action: ValuationCommands,
    },

    /// Maintain the current holdings snapshot
    Holdings {
        #[command(subcommand)]
        action: HoldingsCommands,
    },
}

#[derive(Subcommand)]
pub enum StrategyCommands {
    /// List all strategies
    List,

    /// Show one strategy with its target tree
    Show {
        /// Strategy id
        id: i64,
    },

    /// Create a strategy
    Create {
        /// Strategy name
        name: String,

        /// Drift threshold in percent (1-50)
        #[arg(short, long, default_value = "5")]
        threshold: String,
    },

    /// Update name or threshold
    Update {
        /// Strategy id
        id: i64,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New drift threshold in percent (1-50)
        #[arg(short, long)]
        threshold: Option<String>,
    },

    /// Make a strategy the active one (deactivates any other)
    Activate {
        /// Strategy id
        id: i64,
    },

    /// Delete a strategy and its targets
    Delete {
        /// Strategy id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TargetCommands {
    /// Add a class target to a strategy
    AddClass {
        /// Strategy id
        strategy: i64,

        /// Asset class (e.g. EQUITY, DEBT, REAL_ESTATE)
        class: String,

        /// Target percent of the portfolio (0-100)
        percent: String,
    },

    /// Change a class target's percent
    SetClass {
        /// Strategy id
        strategy: i64,

        /// Asset class
        class: String,

        /// New target percent (0-100)
        percent: String,
    },

    /// Remove a class target (and its sub-targets)
    RemoveClass {
        /// Strategy id
        strategy: i64,

        /// Asset class
        class: String,
    },

    /// Add a sub-class target within a class
    AddSub {
        /// Strategy id
        strategy: i64,

        /// Parent asset class
        class: String,

        /// Asset sub-class (e.g. STOCK, ETF, BOND)
        sub_class: String,

        /// Target percent of the parent class (0-100)
        percent: String,
    },

    /// Change a sub-class target's percent
    SetSub {
        /// Strategy id
        strategy: i64,

        /// Parent asset class
        class: String,

        /// Asset sub-class
        sub_class: String,

        /// New target percent of the parent class (0-100)
        percent: String,
    },

    /// Remove a sub-class target
    RemoveSub {
        /// Strategy id
        strategy: i64,

        /// Parent asset class
        class: String,

        /// Asset sub-class
        sub_class: String,
    },
}

#[derive(Subcommand)]
pub enum ExcludeCommands {
    /// Add or update an exclusion for a symbol
    Add {
        /// Strategy id
        strategy: i64,

        /// Symbol to exclude
        symbol: String,

        /// Data source of the symbol
        #[arg(long, default_value = "MANUAL")]
        data_source: String,

        /// Remove the holding from drift calculation entirely
        #[arg(long)]
        exclude_from_calculation: bool,

        /// Keep the holding but never suggest selling it
        #[arg(long)]
        never_sell: bool,

        /// Optional reason
        #[arg(long)]
        reason: Option<String>,
    },

    /// Remove an exclusion
    Remove {
        /// Strategy id
        strategy: i64,

        /// Symbol
        symbol: String,

        /// Data source of the symbol
        #[arg(long, default_value = "MANUAL")]
        data_source: String,
    },

    /// List exclusions
    List {
        /// Limit to one strategy
        #[arg(long)]
        strategy: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum AllocationCommands {
    /// Show target vs actual allocation with drift per class and sub-class
    Show {
        /// Strategy id (defaults to the active strategy)
        #[arg(long)]
        strategy: Option<i64>,
    },

    /// Generate prioritized rebalancing suggestions
    Suggest {
        /// Strategy id (defaults to the active strategy)
        #[arg(long)]
        strategy: Option<i64>,
    },

    /// Compressed drift summary
    Drift,
}

#[derive(Subcommand)]
pub enum PerformanceCommands {
    /// Show performance over a window of recorded activity and valuations
    Show {
        /// Start date (YYYY-MM-DD; defaults to the earliest record)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD; defaults to the latest valuation)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum HoldingCommands {
    /// Show cost basis, holding period, and IRR for one symbol
    Show {
        /// Symbol
        symbol: String,

        /// Current market price (defaults to the holdings snapshot price)
        #[arg(long)]
        price: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ActivityCommands {
    /// Record an activity
    Add {
        /// Activity type: BUY, SELL, DIVIDEND, INTEREST, FEE, ITEM, LIABILITY
        activity_type: String,

        /// Date (YYYY-MM-DD)
        date: String,

        /// Symbol (required for BUY/SELL)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Quantity
        #[arg(short, long, default_value = "0")]
        quantity: String,

        /// Unit price
        #[arg(short, long, default_value = "0")]
        price: String,

        /// Fee
        #[arg(short, long, default_value = "0")]
        fee: String,

        /// Explicit total value (overrides quantity x price)
        #[arg(short, long)]
        value: Option<String>,
    },

    /// List recorded activities
    List {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ValuationCommands {
    /// Record (or replace) the valuation for a date
    Add {
        /// Date (YYYY-MM-DD)
        date: String,

        /// Total portfolio value at end of day
        total_value: String,

        /// Deposits made during the day
        #[arg(long, default_value = "0")]
        deposits: String,

        /// Withdrawals made during the day
        #[arg(long, default_value = "0")]
        withdrawals: String,
    },

    /// List recorded valuations
    List {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum HoldingsCommands {
    /// Add or update one holding in the snapshot
    Set {
        /// Symbol
        symbol: String,

        /// Asset class (e.g. EQUITY)
        class: String,

        /// Asset sub-class (e.g. ETF)
        sub_class: String,

        /// Quantity held
        quantity: String,

        /// Current market price
        price: String,

        /// Data source of the symbol
        #[arg(long, default_value = "MANUAL")]
        data_source: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// List the current holdings snapshot
    List,

    /// Remove one holding from the snapshot
    Remove {
        /// Symbol
        symbol: String,

        /// Data source of the symbol
        #[arg(long, default_value = "MANUAL")]
        data_source: String,
    },
}
