pub mod assumptions;
pub mod dynamic_irr;
pub mod elasticity;
pub mod factor;
pub mod irr_gaps;
pub mod liquidity_gaps;
pub mod survival;
