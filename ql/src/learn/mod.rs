pub mod exploration;
pub mod learner;
pub mod q_target;
pub mod trajectory;
