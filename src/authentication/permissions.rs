use crate::{jwt::SessionData, schema::UserRole};

const USER_ACTIONS: &[ActionType] = &[
    ActionType::ManageOwnFavorites,
    ActionType::ManageOwnCart,
    ActionType::ManageOwnSubscriptions,
    ActionType::CreateRecipes,
    ActionType::ManageOwnRecipes,
];

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (UserRole::User, USER_ACTIONS),
    (
        UserRole::Moderator,
        &[
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageOwnSubscriptions,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageAllRecipes,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageOwnSubscriptions,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageAllRecipes,
            ActionType::ManageIngredients,
            ActionType::ManageTags,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnFavorites,
    ManageOwnCart,
    ManageOwnSubscriptions,
    ManageOwnRecipes,

    ManageAllRecipes,
    ManageIngredients,
    ManageTags,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let role = &session.role;

        ACTION_TABLE
            .iter()
            .find_map(|(r, actions)| {
                if role != r {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}
