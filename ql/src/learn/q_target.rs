/// Discount rate of future rewards
pub const GAMMA: f32 = 0.99;

/// Temporal-difference target for a single step.
///
/// For terminal steps the updated q-value is exactly the reward (see deepmind paper).
pub fn updated_q_value(
    reward: f32,
    max_future_reward: f32,
    done: bool,
    gamma: f32,
) -> f32 {
    if done {
        reward
    } else {
        reward + gamma * max_future_reward
    }
}

/// Q value = reward + discount factor * expected future reward
pub fn updated_q_values(
    rewards: &[f32],
    max_future_rewards: &[f32],
    done: &[bool],
    gamma: f32,
) -> Vec<f32> {
    assert_eq!(rewards.len(), max_future_rewards.len());
    assert_eq!(rewards.len(), done.len());
    rewards
        .iter()
        .zip(max_future_rewards)
        .zip(done)
        .map(|((&reward, &future), &done)| updated_q_value(reward, future, done, gamma))
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(-1.0, 5.0, true, -1.0)]
    #[case(1.0, 123.0, true, 1.0)]
    #[case(1.0, 2.0, false, 2.98)]
    #[case(0.0, -1.0, false, -0.99)]
    #[case(1.0, 0.0, false, 1.0)]
    fn test_updated_q_value(
        #[case] reward: f32,
        #[case] max_future_reward: f32,
        #[case] done: bool,
        #[case] expected: f32,
    ) {
        assert!((updated_q_value(reward, max_future_reward, done, GAMMA) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_updated_q_values() {
        let q = updated_q_values(&[1.0, 1.0, -1.0], &[10.0, 0.5, 10.0], &[false, false, true], GAMMA);
        assert_eq!(q.len(), 3);
        assert!((q[0] - 10.9).abs() < 1e-5);
        assert!((q[1] - 1.495).abs() < 1e-5);
        assert_eq!(q[2], -1.0);
    }
}
