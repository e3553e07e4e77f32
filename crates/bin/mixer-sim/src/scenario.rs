//! alice deposits, pays bob, bob withdraws, then alice replays her spend

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use shielded_mixer::{
    prepare_deposit, Account, InMemoryKeyDirectory, MerkleRoot, MixerError, Pool, PoolConfig,
    TimedProver, TransparentBackend, Wallet,
};

pub struct Summary {
    pub root: MerkleRoot,
    pub pool_balance: u128,
    pub alice: u128,
    pub bob: u128,
    pub leaves: u64,
    pub spent: usize,
}

pub async fn run(config: PoolConfig, seed: u64, deposit: u64, pay: u64) -> Result<Summary> {
    if pay == 0 || pay > deposit {
        bail!("pay must be in 1..={deposit}, got {pay}");
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let backend = TransparentBackend::new(config.tree_depth);
    let prover = TimedProver::new(backend, config.verify_timeout());
    let mut pool = Pool::new(config, backend).context("failed to create pool")?;

    let mut directory = InMemoryKeyDirectory::new();
    let mut alice = Wallet::new(Account::random(&mut rng));
    let mut bob = Wallet::new(Account::random(&mut rng));
    directory.register(alice.address());
    directory.register(bob.address());
    info!("alice {}", alice.address());
    info!("bob   {}", bob.address());

    // 1. deposit
    let (request, _) = prepare_deposit(&alice.address(), deposit, &mut rng)?;
    let receipt = pool.deposit(request, deposit)?;
    alice.sync(pool.events());
    info!(
        "alice deposited {} at index {:?}, wallet balance {}",
        deposit,
        receipt.indices,
        alice.balance()
    );

    // 2. private transfer with change
    let spend = alice
        .spend()
        .inputs(alice.select_notes(u128::from(pay))?)
        .output(bob.address().apk, pay)
        .build(&pool, &directory, &mut rng)?;
    info!("proving transfer against anchor {}", spend.anchor());
    let transfer = spend.prove(&prover).await?;
    let replay = transfer.clone();
    let receipt = pool.transfer(transfer, 0).await?;
    alice.sync(pool.events());
    bob.sync(pool.events());
    info!(
        "transfer committed {:?}, alice {}, bob {}",
        receipt.indices,
        alice.balance(),
        bob.balance()
    );

    // 3. bob withdraws what he received
    let withdraw = bob
        .spend()
        .inputs(bob.select_notes(u128::from(pay))?)
        .public_out(pay)
        .build(&pool, &directory, &mut rng)?
        .prove(&prover)
        .await?;
    let receipt = pool.withdraw(withdraw, 0).await?;
    bob.sync(pool.events());
    info!("bob withdrew {}, pool now holds {}", receipt.released, pool.balance());

    // 4. replaying alice's transfer must hit the nullifier set
    match pool.transfer(replay, 0).await {
        Err(MixerError::DoubleSpend(nf)) => info!("replay rejected, nullifier {} already spent", nf),
        Err(e) => bail!("replay rejected for the wrong reason: {e}"),
        Ok(_) => bail!("replayed transfer was accepted"),
    }

    if alice.balance() + bob.balance() != pool.balance() {
        warn!("wallet balances do not add up to custody");
    }

    Ok(Summary {
        root: pool.current_root(),
        pool_balance: pool.balance(),
        alice: alice.balance(),
        bob: bob.balance(),
        leaves: pool.leaf_count(),
        spent: pool.spent_count(),
    })
}
