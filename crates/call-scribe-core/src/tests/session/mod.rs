mod manager;
