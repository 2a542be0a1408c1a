use provisioner::Provisioner;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) provisioner: Provisioner,
}
